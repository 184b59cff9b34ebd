mod config;
mod script;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use canvas::consts::ANALYSIS_COMMIT_DELAY_MS;
use canvas::doc::{DocError, Document};
use canvas::engine::{Action, EngineCore};
use canvas::ingest::{AnalysisError, IngestError, parse_findings};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, SessionConfig};
use crate::script::ScriptError;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("document: {0}")]
    Document(#[from] DocError),
    #[error("script: {0}")]
    Script(#[from] ScriptError),
    #[error("findings: {0}")]
    Findings(#[from] IngestError),
    #[error("analysis: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("analysis produced an alert: {0}")]
    Alert(String),
}

#[derive(Parser, Debug)]
#[command(name = "visualqa", about = "Visual QA annotation engine host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted session of host events and write the resulting document.
    Replay(ReplayArgs),
    /// Record a findings file against the open project's active dev image.
    Ingest(IngestArgs),
}

#[derive(Args, Debug)]
struct DocumentArgs {
    /// Document to start from; a fresh empty document when absent.
    #[arg(long, env = "VISUALQA_DOCUMENT")]
    document: Option<PathBuf>,

    /// Where to write the resulting document; stdout when absent.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    #[arg(long, help = "JSON array of scripted events")]
    events: PathBuf,

    #[command(flatten)]
    doc: DocumentArgs,
}

#[derive(Args, Debug)]
struct IngestArgs {
    #[arg(long, help = "Vision-model response: JSON array of findings")]
    findings: PathBuf,

    /// Design image payload to set before analysing.
    #[arg(long)]
    design: Option<String>,

    /// Dev image payload to add before analysing.
    #[arg(long)]
    dev: Option<String>,

    #[command(flatten)]
    doc: DocumentArgs,
}

fn main() -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let session = SessionConfig::from_env()?;

    match cli.command {
        Command::Replay(args) => run_replay(&session, args),
        Command::Ingest(args) => run_ingest(&session, args),
    }
}

fn run_replay(session: &SessionConfig, args: ReplayArgs) -> Result<(), CliError> {
    let mut core = open_engine(session, args.doc.document.as_deref())?;
    let events = script::parse_script(&read(&args.events)?)?;
    let report = script::replay(&mut core, &events)?;

    let issues = core.doc.active_project().map_or(0, |p| p.issues.len());
    info!(
        events = report.events,
        annotations = report.annotations_created,
        alerts = report.alerts.len(),
        issues,
        "replay: done"
    );
    write_document(&core.doc, args.doc.output.as_deref())
}

fn run_ingest(session: &SessionConfig, args: IngestArgs) -> Result<(), CliError> {
    let mut core = open_engine(session, args.doc.document.as_deref())?;
    if core.doc.active_project().is_none() {
        core.add_project("visualqa");
    }
    if let Some(design) = args.design {
        core.upload_design_image(design.into());
    }
    if let Some(dev) = args.dev {
        core.upload_dev_image("dev", dev.into());
    }

    let findings = parse_findings(&read(&args.findings)?)?;
    let request = core.begin_analysis()?;
    info!(dev_image = %request.dev_image_id, findings = findings.len(), "ingest: analysis started");

    core.tick_analysis();
    alerts(core.finish_analysis(Ok(findings)))?;
    std::thread::sleep(Duration::from_millis(u64::from(ANALYSIS_COMMIT_DELAY_MS)));
    alerts(core.commit_analysis())?;

    let issues = core.doc.active_project().map_or(0, |p| p.issues.len());
    info!(issues, "ingest: committed");
    write_document(&core.doc, args.doc.output.as_deref())
}

fn open_engine(session: &SessionConfig, document: Option<&Path>) -> Result<EngineCore, CliError> {
    let doc = match document {
        Some(path) => Document::from_json(&read(path)?)?,
        None => Document::new(),
    };
    let mut core = EngineCore::with_document(doc, session.engine_config());
    core.set_viewport(session.viewport.width, session.viewport.height);
    Ok(core)
}

fn alerts(actions: Vec<Action>) -> Result<(), CliError> {
    match actions.into_iter().find_map(|a| match a {
        Action::Alert(message) => Some(message),
        _ => None,
    }) {
        Some(message) => Err(CliError::Alert(message)),
        None => Ok(()),
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })
}

fn write_document(doc: &Document, output: Option<&Path>) -> Result<(), CliError> {
    let json = doc.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, json).map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;
            info!(path = %path.display(), "document written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
