//! Scripted sessions: a JSON list of host events replayed through the engine.
//!
//! A script stands in for the browser. Each event is what the DOM wiring
//! would forward (pointer, wheel and key events, tool switches, uploads, list
//! clicks). Issues are addressed by their position in the open project's
//! issue list, since ids are not known when the script is written.

use canvas::camera::Point;
use canvas::doc::IssueStatus;
use canvas::engine::{Action, EngineCore};
use canvas::input::{Button, CompareMode, Key, Modifiers, Tool, WheelDelta};
use canvas::sampler::PixelBuffer;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("event {event}: no issue at index {index}")]
    NoSuchIssue { event: usize, index: usize },
    #[error("event {event}: no project at index {index}")]
    NoSuchProject { event: usize, index: usize },
    #[error("event {event}: {message}")]
    Rejected { event: usize, message: String },
}

/// One host event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    Viewport { width: f64, height: f64 },
    /// Layout size of the rendered dev image.
    ImageSize { width: f64, height: f64 },
    AddProject { name: String },
    SelectProject { index: usize },
    UploadDesign { data: String },
    UploadDev { name: String, data: String },
    /// Decoded pixels for the active dev image, filled with one RGBA color.
    Pixels { width: u32, height: u32, rgba: [u8; 4] },
    Tool { tool: Tool },
    CompareMode { mode: CompareMode },
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Press, move and release with the primary button.
    Drag { from: Point, to: Point },
    Wheel {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        dy: f64,
    },
    KeyDown {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyUp { key: String },
    TextFocus { focused: bool },
    SelectIssue { index: usize },
    SetIssueStatus { index: usize, status: IssueStatus },
    Comment { index: usize, text: String },
    DeleteIssue { index: usize },
    Undo,
}

/// What a replay produced besides the document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplayReport {
    pub events: usize,
    pub annotations_created: usize,
    pub alerts: Vec<String>,
}

/// Parse a script file's contents.
///
/// # Errors
///
/// Returns [`ScriptError::Parse`] if the JSON is not an array of known events.
pub fn parse_script(json: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    Ok(serde_json::from_str(json)?)
}

/// Feed `events` to the engine in order.
///
/// # Errors
///
/// Returns the first event that addresses a missing issue or project, or that
/// the engine refuses outright (e.g. an upload with no open project).
pub fn replay(core: &mut EngineCore, events: &[ScriptEvent]) -> Result<ReplayReport, ScriptError> {
    let mut report = ReplayReport::default();
    for (event_index, event) in events.iter().enumerate() {
        debug!(event = event_index, ?event, "replay: event");
        let actions = apply(core, event_index, event)?;
        for action in actions {
            match action {
                Action::AnnotationCreated { annotation_id, .. } => {
                    debug!(%annotation_id, "replay: annotation created");
                    report.annotations_created += 1;
                }
                Action::Alert(message) => {
                    warn!(event = event_index, %message, "replay: alert");
                    report.alerts.push(message);
                }
                _ => {}
            }
        }
        report.events += 1;
    }
    Ok(report)
}

fn apply(core: &mut EngineCore, event_index: usize, event: &ScriptEvent) -> Result<Vec<Action>, ScriptError> {
    let rejected = |message: &str| ScriptError::Rejected { event: event_index, message: message.to_string() };

    let actions = match event {
        ScriptEvent::Viewport { width, height } => {
            core.set_viewport(*width, *height);
            vec![Action::RenderNeeded]
        }
        ScriptEvent::ImageSize { width, height } => {
            core.set_image_size(*width, *height);
            vec![Action::RenderNeeded]
        }
        ScriptEvent::AddProject { name } => {
            core.add_project(name);
            vec![Action::DocumentChanged]
        }
        ScriptEvent::SelectProject { index } => {
            let id = core
                .doc
                .projects()
                .get(*index)
                .map(|p| p.id)
                .ok_or(ScriptError::NoSuchProject { event: event_index, index: *index })?;
            core.select_project(&id);
            vec![Action::DocumentChanged]
        }
        ScriptEvent::UploadDesign { data } => {
            if !core.upload_design_image(data.as_str().into()) {
                return Err(rejected("design upload needs an open project"));
            }
            vec![Action::DocumentChanged]
        }
        ScriptEvent::UploadDev { name, data } => {
            core.upload_dev_image(name, data.as_str().into())
                .ok_or_else(|| rejected("dev upload needs an open project"))?;
            vec![Action::DocumentChanged]
        }
        ScriptEvent::Pixels { width, height, rgba } => {
            let dev_image_id = core
                .active_dev_image_id()
                .ok_or_else(|| rejected("pixels need an active dev image"))?;
            let bytes = PixelBuffer::byte_len(*width, *height).map_err(|e| rejected(&e.to_string()))?;
            let pixels =
                PixelBuffer::new(*width, *height, rgba.repeat(bytes / 4)).map_err(|e| rejected(&e.to_string()))?;
            core.load_pixels(dev_image_id, pixels);
            Vec::new()
        }
        ScriptEvent::Tool { tool } => core.set_tool(*tool),
        ScriptEvent::CompareMode { mode } => core.set_compare_mode(*mode),
        ScriptEvent::PointerDown { x, y, button, modifiers } => core.on_pointer_down(Point::new(*x, *y), *button, *modifiers),
        ScriptEvent::PointerMove { x, y, modifiers } => core.on_pointer_move(Point::new(*x, *y), *modifiers),
        ScriptEvent::PointerUp { x, y, button, modifiers } => core.on_pointer_up(Point::new(*x, *y), *button, *modifiers),
        ScriptEvent::Drag { from, to } => {
            let mut actions = core.on_pointer_down(*from, Button::Primary, Modifiers::default());
            actions.extend(core.on_pointer_move(*to, Modifiers::default()));
            actions.extend(core.on_pointer_up(*to, Button::Primary, Modifiers::default()));
            actions
        }
        ScriptEvent::Wheel { x, y, dy } => {
            core.on_wheel(Point::new(*x, *y), WheelDelta { dx: 0.0, dy: *dy }, Modifiers::default())
        }
        ScriptEvent::KeyDown { key, modifiers } => core.on_key_down(Key(key.clone()), *modifiers),
        ScriptEvent::KeyUp { key } => core.on_key_up(Key(key.clone()), Modifiers::default()),
        ScriptEvent::TextFocus { focused } => {
            core.set_text_focus(*focused);
            Vec::new()
        }
        ScriptEvent::SelectIssue { index } => {
            let id = issue_at(core, event_index, *index)?;
            core.select_issue(&id)
        }
        ScriptEvent::SetIssueStatus { index, status } => {
            let id = issue_at(core, event_index, *index)?;
            core.set_issue_status(&id, *status)
        }
        ScriptEvent::Comment { index, text } => {
            let id = issue_at(core, event_index, *index)?;
            core.add_comment(&id, text)
        }
        ScriptEvent::DeleteIssue { index } => {
            let id = issue_at(core, event_index, *index)?;
            core.delete_issue(&id)
        }
        ScriptEvent::Undo => core.undo(),
    };
    Ok(actions)
}

fn issue_at(core: &EngineCore, event: usize, index: usize) -> Result<canvas::doc::IssueId, ScriptError> {
    core.doc
        .active_project()
        .and_then(|p| p.issues.get(index))
        .map(|issue| issue.id)
        .ok_or(ScriptError::NoSuchIssue { event, index })
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
