//! Vision-model findings and the analysis lifecycle.
//!
//! The vision model itself is an external collaborator. It receives the design
//! and dev images and answers with a JSON array of findings, each optionally
//! carrying a `[ymin, xmin, ymax, xmax]` box on a 0–1000 grid. This module
//! parses that answer leniently (a bad box or severity never drops a finding)
//! and tracks the progress of one analysis from request to commit.

#[cfg(test)]
#[path = "ingest_test.rs"]
mod ingest_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::{ANALYSIS_PROGRESS_CEILING, FINDING_GRID_MAX};
use crate::doc::{DevImageId, ProjectId, Severity};

/// Fraction of the remaining distance to the ceiling covered per tick.
const PROGRESS_EASING: f64 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The response body is not a JSON array of findings.
    #[error("findings parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("an analysis is already running")]
    AlreadyRunning,
    #[error("no analysis is running")]
    NotRunning,
    #[error("analysis needs a design image and a dev image")]
    MissingImages,
    #[error("analysis failed: {0}")]
    Failed(String),
}

/// Box in percentage coordinates (top-left plus size).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Convert a `[ymin, xmin, ymax, xmax]` box on the 0–1000 grid.
    ///
    /// Returns `None` unless the value is exactly four finite numbers with
    /// `ymax >= ymin` and `xmax >= xmin`.
    #[must_use]
    pub fn from_grid(raw: &serde_json::Value) -> Option<Self> {
        let values = raw.as_array()?;
        let [ymin, xmin, ymax, xmax] = values.as_slice() else {
            return None;
        };
        let (ymin, xmin, ymax, xmax) = (ymin.as_f64()?, xmin.as_f64()?, ymax.as_f64()?, xmax.as_f64()?);
        if ![ymin, xmin, ymax, xmax].iter().all(|v| v.is_finite()) || ymax < ymin || xmax < xmin {
            return None;
        }
        let scale = FINDING_GRID_MAX / 100.0;
        Some(Self {
            x: xmin / scale,
            y: ymin / scale,
            width: (xmax - xmin) / scale,
            height: (ymax - ymin) / scale,
        })
    }
}

/// One candidate discrepancy reported by the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<serde_json::Value>,
}

impl Finding {
    /// Severity as reported, defaulting to medium when absent or unknown.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
            .as_deref()
            .and_then(Severity::parse)
            .unwrap_or_default()
    }

    /// The finding's box in percentage space, if it has a usable one.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box.as_ref().and_then(BoundingBox::from_grid)
    }
}

/// Parse the vision model's answer.
///
/// # Errors
///
/// Returns [`IngestError::Parse`] if the body is not an array of objects with
/// at least a `title`.
pub fn parse_findings(json: &str) -> Result<Vec<Finding>, IngestError> {
    serde_json::from_str(json).map_err(|e| IngestError::Parse(e.to_string()))
}

/// Payloads handed to the vision model for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub project_id: ProjectId,
    pub dev_image_id: DevImageId,
    pub design_image: Arc<str>,
    pub dev_image: Arc<str>,
}

/// Lifecycle of one analysis run.
///
/// `Running` progress eases toward [`ANALYSIS_PROGRESS_CEILING`] and never
/// reaches 100 until the real answer arrives; `Ready` holds the findings at
/// 100% until the host commits them.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Analysis {
    #[default]
    Idle,
    Running {
        project_id: ProjectId,
        dev_image_id: DevImageId,
        progress: f64,
    },
    Ready {
        project_id: ProjectId,
        dev_image_id: DevImageId,
        findings: Vec<Finding>,
    },
}

impl Analysis {
    /// Current progress bar value in `[0, 100]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        match self {
            Self::Idle => 0.0,
            Self::Running { progress, .. } => *progress,
            Self::Ready { .. } => 100.0,
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Start tracking a request.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::AlreadyRunning`] unless idle.
    pub fn start(&mut self, request: &AnalysisRequest) -> Result<(), AnalysisError> {
        if self.is_busy() {
            return Err(AnalysisError::AlreadyRunning);
        }
        *self = Self::Running { project_id: request.project_id, dev_image_id: request.dev_image_id, progress: 0.0 };
        Ok(())
    }

    /// Advance the indeterminate progress bar one step.
    pub fn tick(&mut self) {
        if let Self::Running { progress, .. } = self {
            *progress += (ANALYSIS_PROGRESS_CEILING - *progress) * PROGRESS_EASING;
        }
    }

    /// Record the collaborator's answer.
    ///
    /// On success the run becomes `Ready` at 100%. On failure it returns to
    /// idle and the error is handed back for the user-facing alert.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotRunning`] if no run is in progress, or
    /// [`AnalysisError::Failed`] carrying the collaborator's error.
    pub fn finish(&mut self, result: Result<Vec<Finding>, String>) -> Result<(), AnalysisError> {
        let Self::Running { project_id, dev_image_id, .. } = *self else {
            return Err(AnalysisError::NotRunning);
        };
        match result {
            Ok(findings) => {
                *self = Self::Ready { project_id, dev_image_id, findings };
                Ok(())
            }
            Err(message) => {
                *self = Self::Idle;
                Err(AnalysisError::Failed(message))
            }
        }
    }

    /// Take the ready findings, returning to idle.
    pub fn take_ready(&mut self) -> Option<(ProjectId, DevImageId, Vec<Finding>)> {
        match std::mem::take(self) {
            Self::Ready { project_id, dev_image_id, findings } => Some((project_id, dev_image_id, findings)),
            other => {
                *self = other;
                None
            }
        }
    }
}
