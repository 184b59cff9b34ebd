//! Document model: projects, dev images, annotations, and issues.
//!
//! A [`Document`] exclusively owns its projects; a [`Project`] owns its dev
//! images, annotations and issues. Annotations are scoped to one dev image and
//! positioned in percentage coordinates of that image. An [`Issue`] is the
//! tracking wrapper around a finding and may point back at one annotation.
//!
//! Every mutation that targets "the current project" resolves it by id at call
//! time, so callers never hold a reference into a project across mutations.
//! Sparse updates ([`PartialAnnotation`], [`PartialIssue`]) are shallow merges
//! with no validation; callers send type-appropriate fields.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::ingest::{BoundingBox, Finding};

pub type ProjectId = Uuid;
pub type DevImageId = Uuid;
pub type AnnotationId = Uuid;
pub type IssueId = Uuid;
pub type CommentId = Uuid;

/// Label given to annotations created without one.
pub const DEFAULT_ANNOTATION_TEXT: &str = "发现差异";
/// Issue title for a hand-drawn box or pin.
pub const MANUAL_ISSUE_TITLE: &str = "手动标注";
/// Issue title for a distance measurement.
pub const MEASURE_ISSUE_TITLE: &str = "距离测量";
/// Prefix of the issue title for a color sample; the hex value follows.
pub const COLOR_ISSUE_PREFIX: &str = "取色: ";

/// Errors produced when importing or exporting a document.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// The JSON does not describe a valid document.
    #[error("malformed import: {0}")]
    MalformedImport(String),

    /// The document could not be serialized.
    #[error("serialize failed: {0}")]
    Serialize(String),
}

// =============================================================
// Enums
// =============================================================

/// How an annotation was produced, which also decides its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Drawn by hand with the pointer tool (box or pin).
    #[default]
    Manual,
    /// Supplied by the vision model (always a box).
    Ai,
    /// Color sample (carries `color`).
    Color,
    /// Distance measurement (carries `end_x` / `end_y`).
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a lowercase severity name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    WontFix,
}

// =============================================================
// Entities
// =============================================================

/// An uploaded implementation screenshot. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevImage {
    pub id: DevImageId,
    pub name: String,
    /// Encoded image payload, shared between snapshots.
    pub data: Arc<str>,
}

/// Geometric reading of an annotation, derived from its kind and fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Rectangle with top-left at `(x, y)`.
    Box { width: f64, height: f64 },
    /// Single point marker at `(x, y)`.
    Pin,
    /// Color sample marker at `(x, y)`.
    Swatch,
    /// Line from `(x, y)` to `end`.
    Measure { end: Point },
}

/// A positioned marker on one dev image, in percentage coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub dev_image_id: DevImageId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: AnnotationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
}

impl Annotation {
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self.kind {
            AnnotationKind::Manual | AnnotationKind::Ai => match (self.width, self.height) {
                (Some(width), Some(height)) => Shape::Box { width, height },
                _ => Shape::Pin,
            },
            AnnotationKind::Color => Shape::Swatch,
            AnnotationKind::Measure => match (self.end_x, self.end_y) {
                (Some(ex), Some(ey)) => Shape::Measure { end: Point::new(ex, ey) },
                _ => Shape::Pin,
            },
        }
    }

    /// Whether the annotation is a draggable box.
    #[must_use]
    pub fn is_box(&self) -> bool {
        matches!(self.shape(), Shape::Box { .. })
    }

    /// Visual centre in model space; used to frame the annotation.
    #[must_use]
    pub fn center(&self) -> Point {
        match self.shape() {
            Shape::Box { width, height } => Point::new(self.x + width / 2.0, self.y + height / 2.0),
            Shape::Measure { end } => Point::new((self.x + end.x) / 2.0, (self.y + end.y) / 2.0),
            Shape::Pin | Shape::Swatch => Point::new(self.x, self.y),
        }
    }

    /// Whether the kind-specific fields are present as required.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let fields_ok = match self.kind {
            AnnotationKind::Ai => self.width.is_some() && self.height.is_some(),
            AnnotationKind::Manual => self.width.is_some() == self.height.is_some(),
            AnnotationKind::Color => self.color.is_some(),
            AnnotationKind::Measure => self.end_x.is_some() && self.end_y.is_some(),
        };
        let finite = [Some(self.x), Some(self.y), self.width, self.height, self.end_x, self.end_y]
            .into_iter()
            .flatten()
            .all(f64::is_finite);
        fields_ok && finite
    }
}

/// An append-only remark on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
}

/// A tracked finding, optionally anchored to one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: IssueId,
    pub dev_image_id: DevImageId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_id: Option<AnnotationId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

/// One design reference compared against any number of dev screenshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_image: Option<Arc<str>>,
    #[serde(default)]
    pub dev_images: Vec<DevImage>,
    #[serde(default)]
    pub active_dev_image_id: Option<DevImageId>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Project {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            design_image: None,
            dev_images: Vec::new(),
            active_dev_image_id: None,
            issues: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// The dev image currently being annotated: the active one if it still
    /// exists, otherwise the first.
    #[must_use]
    pub fn effective_dev_image_id(&self) -> Option<DevImageId> {
        self.active_dev_image_id
            .filter(|id| self.dev_image(id).is_some())
            .or_else(|| self.dev_images.first().map(|img| img.id))
    }

    #[must_use]
    pub fn dev_image(&self, id: &DevImageId) -> Option<&DevImage> {
        self.dev_images.iter().find(|img| &img.id == id)
    }

    #[must_use]
    pub fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| &a.id == id)
    }

    #[must_use]
    pub fn issue(&self, id: &IssueId) -> Option<&Issue> {
        self.issues.iter().find(|i| &i.id == id)
    }

    /// The issue wrapping `annotation_id`, if any.
    #[must_use]
    pub fn issue_for_annotation(&self, annotation_id: &AnnotationId) -> Option<&Issue> {
        self.issues
            .iter()
            .find(|i| i.annotation_id.as_ref() == Some(annotation_id))
    }

    /// Annotations on one dev image, in creation order.
    pub fn annotations_on<'a>(&'a self, dev_image_id: &'a DevImageId) -> impl Iterator<Item = &'a Annotation> {
        self.annotations
            .iter()
            .filter(move |a| &a.dev_image_id == dev_image_id)
    }

    /// Issues on one dev image, in list order: manual issues go to the
    /// front as they are created, AI findings are appended in finding order.
    pub fn issues_on<'a>(&'a self, dev_image_id: &'a DevImageId) -> impl Iterator<Item = &'a Issue> {
        self.issues
            .iter()
            .filter(move |i| &i.dev_image_id == dev_image_id)
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(active) = self.active_dev_image_id {
            if self.dev_image(&active).is_none() {
                return Err(format!("project {}: activeDevImageId {active} is not a dev image", self.id));
            }
        }
        for ann in &self.annotations {
            if self.dev_image(&ann.dev_image_id).is_none() {
                return Err(format!("annotation {}: dev image {} does not exist", ann.id, ann.dev_image_id));
            }
            if !ann.is_well_formed() {
                return Err(format!("annotation {}: fields do not match type {:?}", ann.id, ann.kind));
            }
        }
        for issue in &self.issues {
            if self.dev_image(&issue.dev_image_id).is_none() {
                return Err(format!("issue {}: dev image {} does not exist", issue.id, issue.dev_image_id));
            }
            let Some(ann_id) = issue.annotation_id else {
                continue;
            };
            match self.annotation(&ann_id) {
                Some(ann) if ann.dev_image_id == issue.dev_image_id => {}
                Some(_) => return Err(format!("issue {}: annotation {ann_id} is on another dev image", issue.id)),
                None => return Err(format!("issue {}: annotation {ann_id} does not exist", issue.id)),
            }
        }
        Ok(())
    }
}

// =============================================================
// Sparse inputs
// =============================================================

/// Fields for a new annotation. Absent `kind` means manual, absent `text`
/// means [`DEFAULT_ANNOTATION_TEXT`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAnnotation {
    pub kind: Option<AnnotationKind>,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub end_x: Option<f64>,
    pub end_y: Option<f64>,
    pub text: Option<String>,
    pub color: Option<String>,
}

impl NewAnnotation {
    /// A manual pin at `at`.
    #[must_use]
    pub fn pin(at: Point) -> Self {
        Self { x: at.x, y: at.y, ..Self::default() }
    }

    /// A manual box spanning the two corners in any order.
    #[must_use]
    pub fn rect_between(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: Some((b.x - a.x).abs()),
            height: Some((b.y - a.y).abs()),
            ..Self::default()
        }
    }

    /// A measurement from `start` to `end`.
    #[must_use]
    pub fn measure(start: Point, end: Point) -> Self {
        Self {
            kind: Some(AnnotationKind::Measure),
            x: start.x,
            y: start.y,
            end_x: Some(end.x),
            end_y: Some(end.y),
            ..Self::default()
        }
    }

    /// A color sample at `at`; the hex value doubles as the label.
    #[must_use]
    pub fn color(at: Point, hex: &str) -> Self {
        Self {
            kind: Some(AnnotationKind::Color),
            x: at.x,
            y: at.y,
            text: Some(hex.to_string()),
            color: Some(hex.to_string()),
            ..Self::default()
        }
    }
}

/// Sparse update for an annotation. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAnnotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Sparse update for an issue. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
}

fn issue_title(kind: AnnotationKind, text: &str, color: Option<&str>) -> String {
    match kind {
        AnnotationKind::Manual => MANUAL_ISSUE_TITLE.to_string(),
        AnnotationKind::Measure => MEASURE_ISSUE_TITLE.to_string(),
        AnnotationKind::Color => format!("{COLOR_ISSUE_PREFIX}{}", color.unwrap_or(text)),
        AnnotationKind::Ai => text.to_string(),
    }
}

// =============================================================
// Document
// =============================================================

/// The full project collection plus which project is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    active_project_id: Option<ProjectId>,
}

impl Document {
    /// Create an empty document with no projects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document holding one empty project, which is active.
    #[must_use]
    pub fn with_project(name: &str) -> Self {
        let mut doc = Self::new();
        doc.add_project(name);
        doc
    }

    // --- Queries ---

    #[must_use]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// The open project: the active one if it exists, otherwise the first.
    #[must_use]
    pub fn active_project_id(&self) -> Option<ProjectId> {
        self.active_project_id
            .filter(|id| self.project(id).is_some())
            .or_else(|| self.projects.first().map(|p| p.id))
    }

    #[must_use]
    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn active_project(&self) -> Option<&Project> {
        let id = self.active_project_id()?;
        self.project(&id)
    }

    fn project_mut(&mut self, id: &ProjectId) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| &p.id == id)
    }

    fn active_project_mut(&mut self) -> Option<&mut Project> {
        let id = self.active_project_id()?;
        self.project_mut(&id)
    }

    // --- Snapshots ---

    /// Deep copy of the project collection. Image payloads are shared.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Project> {
        self.projects.clone()
    }

    /// Replace the project collection wholesale, keeping the open project if
    /// it still exists.
    pub fn restore(&mut self, projects: Vec<Project>) {
        self.projects = projects;
        if self.active_project_id.is_some_and(|id| self.project(&id).is_none()) {
            self.active_project_id = self.projects.first().map(|p| p.id);
        }
    }

    // --- Projects ---

    /// Append a new empty project and open it.
    pub fn add_project(&mut self, name: &str) -> ProjectId {
        let project = Project::new(name);
        let id = project.id;
        self.projects.push(project);
        self.active_project_id = Some(id);
        id
    }

    pub fn rename_project(&mut self, id: &ProjectId, name: &str) -> bool {
        let Some(project) = self.project_mut(id) else {
            return false;
        };
        project.name = name.to_string();
        true
    }

    /// Remove a project. If it was open, the first remaining one opens.
    pub fn delete_project(&mut self, id: &ProjectId) -> bool {
        let before = self.projects.len();
        self.projects.retain(|p| &p.id != id);
        if self.projects.len() == before {
            return false;
        }
        if self.active_project_id.as_ref() == Some(id) {
            self.active_project_id = self.projects.first().map(|p| p.id);
        }
        true
    }

    pub fn select_project(&mut self, id: &ProjectId) -> bool {
        if self.project(id).is_none() {
            return false;
        }
        self.active_project_id = Some(*id);
        true
    }

    // --- Images ---

    /// Set (or replace) the open project's design reference.
    pub fn set_design_image(&mut self, data: Arc<str>) -> bool {
        let Some(project) = self.active_project_mut() else {
            return false;
        };
        project.design_image = Some(data);
        true
    }

    /// Append a dev screenshot to the open project and make it active.
    pub fn add_dev_image(&mut self, name: &str, data: Arc<str>) -> Option<DevImageId> {
        let project = self.active_project_mut()?;
        let id = Uuid::new_v4();
        project.dev_images.push(DevImage { id, name: name.to_string(), data });
        project.active_dev_image_id = Some(id);
        Some(id)
    }

    /// Remove a dev screenshot along with the annotations and issues scoped to it.
    pub fn delete_dev_image(&mut self, id: &DevImageId) -> bool {
        let Some(project) = self.active_project_mut() else {
            return false;
        };
        let before = project.dev_images.len();
        project.dev_images.retain(|img| &img.id != id);
        if project.dev_images.len() == before {
            return false;
        }
        project.annotations.retain(|a| &a.dev_image_id != id);
        project.issues.retain(|i| &i.dev_image_id != id);
        if project.active_dev_image_id.as_ref() == Some(id) {
            project.active_dev_image_id = project.dev_images.first().map(|img| img.id);
        }
        true
    }

    pub fn select_dev_image(&mut self, id: &DevImageId) -> bool {
        let Some(project) = self.active_project_mut() else {
            return false;
        };
        if project.dev_image(id).is_none() {
            return false;
        }
        project.active_dev_image_id = Some(*id);
        true
    }

    // --- Annotations / issues ---

    /// Create an annotation on the active dev image together with its issue.
    ///
    /// The issue is prepended (newest first) and the annotation appended.
    /// Returns `None` when there is no open project or no dev image.
    pub fn add_annotation(&mut self, new: NewAnnotation) -> Option<(AnnotationId, IssueId)> {
        let project = self.active_project_mut()?;
        let dev_image_id = project.effective_dev_image_id()?;

        let kind = new.kind.unwrap_or_default();
        let text = new.text.unwrap_or_else(|| DEFAULT_ANNOTATION_TEXT.to_string());
        let annotation = Annotation {
            id: Uuid::new_v4(),
            dev_image_id,
            x: new.x,
            y: new.y,
            width: new.width,
            height: new.height,
            text: text.clone(),
            kind,
            color: new.color,
            end_x: new.end_x,
            end_y: new.end_y,
        };
        let issue = Issue {
            id: Uuid::new_v4(),
            dev_image_id,
            title: issue_title(kind, &text, annotation.color.as_deref()),
            description: text,
            suggestion: None,
            severity: Severity::Medium,
            status: IssueStatus::Open,
            annotation_id: Some(annotation.id),
            comments: Vec::new(),
        };
        let ids = (annotation.id, issue.id);
        project.annotations.push(annotation);
        project.issues.insert(0, issue);
        Some(ids)
    }

    /// Shallow-merge `partial` into an annotation of the open project.
    pub fn update_annotation(&mut self, id: &AnnotationId, partial: &PartialAnnotation) -> bool {
        let Some(project) = self.active_project_mut() else {
            return false;
        };
        let Some(ann) = project.annotations.iter_mut().find(|a| &a.id == id) else {
            return false;
        };
        if let Some(x) = partial.x {
            ann.x = x;
        }
        if let Some(y) = partial.y {
            ann.y = y;
        }
        if let Some(w) = partial.width {
            ann.width = Some(w);
        }
        if let Some(h) = partial.height {
            ann.height = Some(h);
        }
        if let Some(ex) = partial.end_x {
            ann.end_x = Some(ex);
        }
        if let Some(ey) = partial.end_y {
            ann.end_y = Some(ey);
        }
        if let Some(ref text) = partial.text {
            ann.text.clone_from(text);
        }
        if let Some(ref color) = partial.color {
            ann.color = Some(color.clone());
        }
        true
    }

    /// Shallow-merge `partial` into an issue of the open project.
    pub fn update_issue(&mut self, id: &IssueId, partial: &PartialIssue) -> bool {
        let Some(project) = self.active_project_mut() else {
            return false;
        };
        let Some(issue) = project.issues.iter_mut().find(|i| &i.id == id) else {
            return false;
        };
        if let Some(ref title) = partial.title {
            issue.title.clone_from(title);
        }
        if let Some(ref description) = partial.description {
            issue.description.clone_from(description);
        }
        if let Some(ref suggestion) = partial.suggestion {
            issue.suggestion = Some(suggestion.clone());
        }
        if let Some(severity) = partial.severity {
            issue.severity = severity;
        }
        if let Some(status) = partial.status {
            issue.status = status;
        }
        true
    }

    /// Remove an issue and its linked annotation. Returns the removed issue.
    pub fn delete_issue(&mut self, id: &IssueId) -> Option<Issue> {
        let project = self.active_project_mut()?;
        let index = project.issues.iter().position(|i| &i.id == id)?;
        let issue = project.issues.remove(index);
        if let Some(ann_id) = issue.annotation_id {
            project.annotations.retain(|a| a.id != ann_id);
        }
        Some(issue)
    }

    /// Append a comment to an issue of the open project.
    pub fn add_comment(&mut self, issue_id: &IssueId, text: &str) -> Option<CommentId> {
        let project = self.active_project_mut()?;
        let issue = project.issues.iter_mut().find(|i| &i.id == issue_id)?;
        let id = Uuid::new_v4();
        issue.comments.push(Comment { id, text: text.to_string() });
        Some(id)
    }

    /// Record vision-model findings against one dev image in a single update.
    ///
    /// Each finding becomes an issue; findings with a usable bounding box also
    /// get an `ai` annotation. Returns `None` (and changes nothing) when the
    /// project or dev image no longer exists.
    pub fn ingest_findings(
        &mut self,
        project_id: &ProjectId,
        dev_image_id: &DevImageId,
        findings: &[Finding],
    ) -> Option<Vec<IssueId>> {
        let project = self.project_mut(project_id)?;
        project.dev_image(dev_image_id)?;

        let mut annotations = Vec::new();
        let mut issues = Vec::with_capacity(findings.len());
        for finding in findings {
            let annotation_id = finding.bounding_box().map(|bbox| {
                let ann = ai_annotation(*dev_image_id, &finding.title, bbox);
                let id = ann.id;
                annotations.push(ann);
                id
            });
            issues.push(Issue {
                id: Uuid::new_v4(),
                dev_image_id: *dev_image_id,
                title: finding.title.clone(),
                description: finding.description.clone(),
                suggestion: finding.suggestion.clone(),
                severity: finding.severity(),
                status: IssueStatus::Open,
                annotation_id,
                comments: Vec::new(),
            });
        }

        let ids = issues.iter().map(|i| i.id).collect();
        project.annotations.extend(annotations);
        project.issues.extend(issues);
        Some(ids)
    }

    // --- Import / export ---

    /// Parse and validate a backup document.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::MalformedImport`] if the JSON does not match the
    /// document shape or breaks a project invariant.
    pub fn from_json(json: &str) -> Result<Self, DocError> {
        let doc: Self = serde_json::from_str(json).map_err(|e| DocError::MalformedImport(e.to_string()))?;
        for project in &doc.projects {
            project.validate().map_err(DocError::MalformedImport)?;
        }
        if let Some(active) = doc.active_project_id {
            if doc.project(&active).is_none() {
                return Err(DocError::MalformedImport(format!("activeProjectId {active} is not a project")));
            }
        }
        Ok(doc)
    }

    /// Serialize the whole document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DocError> {
        serde_json::to_string_pretty(self).map_err(|e| DocError::Serialize(e.to_string()))
    }
}

fn ai_annotation(dev_image_id: DevImageId, title: &str, bbox: BoundingBox) -> Annotation {
    Annotation {
        id: Uuid::new_v4(),
        dev_image_id,
        x: bbox.x,
        y: bbox.y,
        width: Some(bbox.width),
        height: Some(bbox.height),
        text: title.to_string(),
        kind: AnnotationKind::Ai,
        color: None,
        end_x: None,
        end_y: None,
    }
}
