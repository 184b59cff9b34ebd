use std::sync::Arc;

use log::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::camera::{Camera, Point, Rect, Size, model_distance, screen_delta_to_model, screen_to_model};
use crate::consts::{
    BOX_DRAG_THRESHOLD_PCT, DEFAULT_ZOOM, FOCUS_ZOOM, HISTORY_CAPACITY, MIN_BOX_SIZE_PCT, REPORT_DEFAULT_ZOOM,
    RULER_MIN_LENGTH_PCT,
};
use crate::doc::{
    AnnotationId, DevImageId, Document, IssueId, IssueStatus, NewAnnotation, PartialAnnotation, PartialIssue,
    ProjectId, Shape,
};
use crate::history::History;
use crate::hit::{self, Hit, HitPart};
use crate::ingest::{Analysis, AnalysisError, AnalysisRequest, Finding};
use crate::input::{Button, CompareMode, InputState, Key, Modifiers, Selection, Tool, UiState, WheelDelta};
use crate::render;
use crate::sampler::{ColorSampler, PixelBuffer};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A tool gesture created an annotation and its paired issue.
    AnnotationCreated { annotation_id: AnnotationId, issue_id: IssueId },
    AnnotationUpdated { id: AnnotationId, fields: PartialAnnotation },
    IssueUpdated { id: IssueId, fields: PartialIssue },
    /// An issue was deleted, along with its linked annotation if any.
    IssueDeleted { id: IssueId, annotation_id: Option<AnnotationId> },
    /// The selection changed; both sides are already resolved.
    SelectionChanged { annotation_id: Option<AnnotationId>, issue_id: Option<IssueId> },
    /// The project collection was replaced or restructured (undo, ingest, project ops).
    DocumentChanged,
    /// A move/resize drag began: route window-level pointer events to the engine.
    CapturePointer,
    /// The drag ended: remove the window-level listeners.
    ReleasePointer,
    SetCursor(String),
    /// A user-facing failure to show as a blocking alert.
    Alert(String),
    RenderNeeded,
}

/// Tunables for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Undo snapshots retained.
    pub history_capacity: usize,
    /// Zoom used when framing a selected issue's annotation.
    pub focus_zoom: f64,
    /// Zoom restored by the reset shortcut.
    pub default_zoom: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { history_capacity: HISTORY_CAPACITY, focus_zoom: FOCUS_ZOOM, default_zoom: DEFAULT_ZOOM }
    }
}

impl EngineConfig {
    /// Settings for the standalone report viewer, which opens zoomed out.
    #[must_use]
    pub fn report_viewer() -> Self {
        Self { default_zoom: REPORT_DEFAULT_ZOOM, ..Self::default() }
    }
}

/// Core engine state: everything that does not touch the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub doc: Document,
    pub history: History,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub sampler: ColorSampler,
    pub analysis: Analysis,
    pub config: EngineConfig,
    /// Comparison viewport size in CSS pixels.
    pub viewport: Size,
    /// Untransformed layout size of the dev image in CSS pixels.
    pub image_size: Size,
    pub dpr: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    /// Start from an existing document (e.g. an imported backup). History is empty.
    #[must_use]
    pub fn with_document(doc: Document, config: EngineConfig) -> Self {
        Self {
            doc,
            history: History::new(config.history_capacity),
            camera: Camera::with_zoom(config.default_zoom),
            ui: UiState::default(),
            input: InputState::default(),
            sampler: ColorSampler::new(),
            analysis: Analysis::default(),
            config,
            viewport: Size::default(),
            image_size: Size::default(),
            dpr: 1.0,
        }
    }

    // --- Layout ---

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    pub fn set_image_size(&mut self, width: f64, height: f64) {
        self.image_size = Size::new(width, height);
    }

    /// Screen rectangle of the rendered dev image under the current camera.
    #[must_use]
    pub fn image_rect(&self) -> Rect {
        self.camera.image_rect(self.viewport, self.image_size)
    }

    // --- Queries ---

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.ui.tool
    }

    /// The dev image being annotated in the open project.
    #[must_use]
    pub fn active_dev_image_id(&self) -> Option<DevImageId> {
        self.doc.active_project()?.effective_dev_image_id()
    }

    #[must_use]
    pub fn active_annotation_id(&self) -> Option<AnnotationId> {
        let project = self.doc.active_project()?;
        self.ui.selection?.annotation_id(project)
    }

    #[must_use]
    pub fn active_issue_id(&self) -> Option<IssueId> {
        let project = self.doc.active_project()?;
        self.ui.selection?.issue_id(project)
    }

    // --- History ---

    fn checkpoint(&mut self) {
        self.history.push(self.doc.projects());
    }

    /// Restore the project collection captured before the last undoable action.
    pub fn undo(&mut self) -> Vec<Action> {
        let Some(snapshot) = self.history.pop() else {
            return Vec::new();
        };
        self.doc.restore(snapshot);
        let mut actions = self.abort_gesture();
        if self.ui.selection.is_some() && self.active_issue_id().is_none() && self.active_annotation_id().is_none() {
            self.ui.selection = None;
            actions.push(Action::SelectionChanged { annotation_id: None, issue_id: None });
        }
        debug!("undo: restored snapshot, {} left", self.history.len());
        actions.push(Action::DocumentChanged);
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Projects and images ---

    pub fn add_project(&mut self, name: &str) -> ProjectId {
        self.checkpoint();
        self.clear_selection_silently();
        self.doc.add_project(name)
    }

    pub fn rename_project(&mut self, id: &ProjectId, name: &str) -> bool {
        if self.doc.project(id).is_none() {
            return false;
        }
        self.checkpoint();
        self.doc.rename_project(id, name)
    }

    pub fn delete_project(&mut self, id: &ProjectId) -> bool {
        if self.doc.project(id).is_none() {
            return false;
        }
        self.checkpoint();
        self.clear_selection_silently();
        self.doc.delete_project(id)
    }

    /// Open another project. Not undoable.
    pub fn select_project(&mut self, id: &ProjectId) -> bool {
        if !self.doc.select_project(id) {
            return false;
        }
        self.abort_gesture();
        self.clear_selection_silently();
        true
    }

    pub fn upload_design_image(&mut self, data: Arc<str>) -> bool {
        if self.doc.active_project().is_none() {
            return false;
        }
        self.checkpoint();
        self.doc.set_design_image(data)
    }

    /// Add a dev screenshot to the open project; it becomes the active image.
    pub fn upload_dev_image(&mut self, name: &str, data: Arc<str>) -> Option<DevImageId> {
        self.doc.active_project()?;
        self.checkpoint();
        self.clear_selection_silently();
        self.doc.add_dev_image(name, data)
    }

    pub fn delete_dev_image(&mut self, id: &DevImageId) -> bool {
        if self.doc.active_project().and_then(|p| p.dev_image(id)).is_none() {
            return false;
        }
        self.checkpoint();
        self.clear_selection_silently();
        self.doc.delete_dev_image(id)
    }

    /// Switch the dev image being annotated. Not undoable.
    pub fn select_dev_image(&mut self, id: &DevImageId) -> bool {
        if !self.doc.select_dev_image(id) {
            return false;
        }
        self.abort_gesture();
        self.clear_selection_silently();
        self.ui.hover_sample = None;
        true
    }

    /// Hand decoded pixels of a dev image to the color picker.
    pub fn load_pixels(&mut self, dev_image_id: DevImageId, pixels: PixelBuffer) {
        self.sampler.load(dev_image_id, pixels);
    }

    // --- Annotations and issues ---

    /// Create an annotation with its issue on the active dev image and select it.
    pub fn add_annotation(&mut self, new: NewAnnotation) -> Vec<Action> {
        if self.active_dev_image_id().is_none() {
            return Vec::new();
        }
        self.checkpoint();
        let Some((annotation_id, issue_id)) = self.doc.add_annotation(new) else {
            return Vec::new();
        };
        debug!("annotation created: {annotation_id}");
        self.ui.selection = Some(Selection::Issue(issue_id));
        vec![
            Action::AnnotationCreated { annotation_id, issue_id },
            Action::SelectionChanged { annotation_id: Some(annotation_id), issue_id: Some(issue_id) },
            Action::RenderNeeded,
        ]
    }

    /// Patch an annotation without recording history (label edits, drag steps).
    pub fn update_annotation(&mut self, id: &AnnotationId, fields: PartialAnnotation) -> Vec<Action> {
        if !self.doc.update_annotation(id, &fields) {
            return Vec::new();
        }
        vec![Action::AnnotationUpdated { id: *id, fields }, Action::RenderNeeded]
    }

    pub fn update_issue(&mut self, id: &IssueId, fields: PartialIssue) -> Vec<Action> {
        if !self.doc.update_issue(id, &fields) {
            return Vec::new();
        }
        vec![Action::IssueUpdated { id: *id, fields }]
    }

    pub fn set_issue_status(&mut self, id: &IssueId, status: IssueStatus) -> Vec<Action> {
        self.update_issue(id, PartialIssue { status: Some(status), ..Default::default() })
    }

    pub fn add_comment(&mut self, issue_id: &IssueId, text: &str) -> Vec<Action> {
        if self.doc.add_comment(issue_id, text).is_none() {
            return Vec::new();
        }
        vec![Action::IssueUpdated { id: *issue_id, fields: PartialIssue::default() }]
    }

    /// Delete an issue and its linked annotation.
    pub fn delete_issue(&mut self, id: &IssueId) -> Vec<Action> {
        if self.doc.active_project().and_then(|p| p.issue(id)).is_none() {
            return Vec::new();
        }
        self.checkpoint();
        let Some(issue) = self.doc.delete_issue(id) else {
            return Vec::new();
        };
        let mut actions = vec![Action::IssueDeleted { id: issue.id, annotation_id: issue.annotation_id }];
        if self.ui.selection.is_some() && self.active_issue_id().is_none() && self.active_annotation_id().is_none() {
            self.ui.selection = None;
            actions.push(Action::SelectionChanged { annotation_id: None, issue_id: None });
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Selection ---

    pub fn select_annotation(&mut self, id: &AnnotationId) -> Vec<Action> {
        if self.doc.active_project().and_then(|p| p.annotation(id)).is_none() {
            return Vec::new();
        }
        self.ui.selection = Some(Selection::Annotation(*id));
        vec![self.selection_changed(), Action::RenderNeeded]
    }

    /// Select an issue from the list and frame its annotation, if it has one.
    pub fn select_issue(&mut self, id: &IssueId) -> Vec<Action> {
        let Some(issue) = self.doc.active_project().and_then(|p| p.issue(id)) else {
            return Vec::new();
        };
        let dev_image_id = issue.dev_image_id;
        if Some(dev_image_id) != self.active_dev_image_id() {
            self.doc.select_dev_image(&dev_image_id);
            self.ui.hover_sample = None;
        }
        self.ui.selection = Some(Selection::Issue(*id));

        let center = self
            .active_annotation_id()
            .and_then(|ann_id| self.doc.active_project()?.annotation(&ann_id).map(|a| a.center()));
        if let Some(center) = center {
            if self.image_size.is_positive() {
                self.camera.frame(center, self.image_size, self.config.focus_zoom);
            }
        }
        vec![self.selection_changed(), Action::RenderNeeded]
    }

    pub fn clear_selection(&mut self) -> Vec<Action> {
        if self.ui.selection.take().is_none() {
            return Vec::new();
        }
        vec![self.selection_changed(), Action::RenderNeeded]
    }

    fn clear_selection_silently(&mut self) {
        self.ui.selection = None;
    }

    fn selection_changed(&self) -> Action {
        Action::SelectionChanged { annotation_id: self.active_annotation_id(), issue_id: self.active_issue_id() }
    }

    // --- Analysis ---

    /// Begin a vision-model analysis of the open project's design and active dev image.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingImages`] without a design image or dev
    /// image, or [`AnalysisError::AlreadyRunning`] while another run is pending.
    pub fn begin_analysis(&mut self) -> Result<AnalysisRequest, AnalysisError> {
        let project = self.doc.active_project().ok_or(AnalysisError::MissingImages)?;
        let design_image = project.design_image.clone().ok_or(AnalysisError::MissingImages)?;
        let dev = project
            .effective_dev_image_id()
            .and_then(|id| project.dev_image(&id))
            .ok_or(AnalysisError::MissingImages)?;
        let request = AnalysisRequest {
            project_id: project.id,
            dev_image_id: dev.id,
            design_image,
            dev_image: dev.data.clone(),
        };
        self.analysis.start(&request)?;
        debug!("analysis started for dev image {}", request.dev_image_id);
        Ok(request)
    }

    /// Advance the progress bar of a running analysis.
    pub fn tick_analysis(&mut self) -> Vec<Action> {
        if !matches!(self.analysis, Analysis::Running { .. }) {
            return Vec::new();
        }
        self.analysis.tick();
        vec![Action::RenderNeeded]
    }

    /// Hand the collaborator's answer to the engine.
    ///
    /// Failures become an alert and leave the document untouched. Successful
    /// findings wait at 100% for [`Self::commit_analysis`].
    pub fn finish_analysis(&mut self, result: Result<Vec<Finding>, String>) -> Vec<Action> {
        match self.analysis.finish(result) {
            Ok(()) => vec![Action::RenderNeeded],
            Err(e) => {
                warn!("analysis: {e}");
                vec![Action::Alert(e.to_string()), Action::RenderNeeded]
            }
        }
    }

    /// Commit ready findings in one undoable mutation.
    pub fn commit_analysis(&mut self) -> Vec<Action> {
        let Some((project_id, dev_image_id, findings)) = self.analysis.take_ready() else {
            return Vec::new();
        };
        let exists = self
            .doc
            .project(&project_id)
            .and_then(|p| p.dev_image(&dev_image_id))
            .is_some();
        if !exists {
            warn!("analysis: dev image {dev_image_id} no longer exists, dropping findings");
            return vec![Action::Alert("the analysed image was removed before results arrived".into())];
        }
        self.checkpoint();
        let ids = self
            .doc
            .ingest_findings(&project_id, &dev_image_id, &findings)
            .unwrap_or_default();
        debug!("analysis: ingested {} findings", ids.len());
        vec![Action::DocumentChanged, Action::RenderNeeded]
    }

    // --- Tool / mode ---

    /// Switch tools, abandoning any uncommitted gesture.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = self.abort_gesture();
        self.ui.tool = tool;
        if tool != Tool::ColorPicker {
            self.ui.hover_sample = None;
        }
        actions.push(Action::SetCursor(tool_cursor(tool).into()));
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn set_compare_mode(&mut self, mode: CompareMode) -> Vec<Action> {
        self.ui.compare_mode = mode;
        if mode != CompareMode::Overlay && matches!(self.input, InputState::Aligning { .. }) {
            self.input = InputState::Idle;
        }
        vec![Action::RenderNeeded]
    }

    /// Track whether a text input has focus; global shortcuts are suppressed while it does.
    pub fn set_text_focus(&mut self, focused: bool) {
        self.ui.text_focus = focused;
    }

    fn abort_gesture(&mut self) -> Vec<Action> {
        let was_drag = self.input.is_annotation_drag();
        self.input = InputState::Idle;
        if was_drag { vec![Action::ReleasePointer] } else { Vec::new() }
    }

    // --- Input events ---

    /// A press while a move or resize drag is still live ends that drag first,
    /// so its window listeners are released before the new gesture begins.
    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        self.ui.cursor_screen = Some(screen);
        let mut actions = self.abort_gesture();
        actions.extend(self.begin_gesture(screen, button));
        actions
    }

    fn begin_gesture(&mut self, screen: Point, button: Button) -> Vec<Action> {
        if self.ui.tool == Tool::Hand || self.ui.space_held || button == Button::Middle {
            self.input = InputState::Panning { last_screen: screen };
            return vec![Action::SetCursor("grabbing".into())];
        }
        if button != Button::Primary {
            return Vec::new();
        }

        match self.ui.tool {
            Tool::Pointer => self.pointer_down(screen),
            Tool::Ruler => match self.model_point_inside(screen) {
                Some(start) => {
                    self.input = InputState::Measuring { start, current: start };
                    vec![Action::RenderNeeded]
                }
                None => Vec::new(),
            },
            Tool::ColorPicker => self.commit_color_sample(screen),
            Tool::Aligner => {
                if self.ui.compare_mode == CompareMode::Overlay {
                    self.input = InputState::Aligning { last_screen: screen };
                }
                Vec::new()
            }
            Tool::Hand => Vec::new(),
        }
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        self.ui.cursor_screen = Some(screen);
        let rect = self.image_rect();

        match self.input.clone() {
            InputState::Idle => {
                if self.ui.tool == Tool::ColorPicker {
                    self.refresh_hover_sample(screen);
                    return vec![Action::RenderNeeded];
                }
                Vec::new()
            }
            InputState::Panning { last_screen } => {
                self.camera.pan_by(screen.x - last_screen.x, screen.y - last_screen.y);
                self.input = InputState::Panning { last_screen: screen };
                vec![Action::RenderNeeded]
            }
            InputState::Selecting { start, .. } => {
                self.input = InputState::Selecting { start, current: screen_to_model(screen, rect) };
                vec![Action::RenderNeeded]
            }
            InputState::Measuring { start, .. } => {
                self.input = InputState::Measuring { start, current: screen_to_model(screen, rect) };
                vec![Action::RenderNeeded]
            }
            InputState::MovingAnnotation { id, start_screen, orig_x, orig_y } => {
                let d = screen_delta_to_model(screen.x - start_screen.x, screen.y - start_screen.y, rect);
                let fields = PartialAnnotation { x: Some(orig_x + d.x), y: Some(orig_y + d.y), ..Default::default() };
                self.update_annotation(&id, fields)
            }
            InputState::ResizingAnnotation { id, start_screen, orig_w, orig_h } => {
                let d = screen_delta_to_model(screen.x - start_screen.x, screen.y - start_screen.y, rect);
                let fields = PartialAnnotation {
                    width: Some((orig_w + d.x).max(MIN_BOX_SIZE_PCT)),
                    height: Some((orig_h + d.y).max(MIN_BOX_SIZE_PCT)),
                    ..Default::default()
                };
                self.update_annotation(&id, fields)
            }
            InputState::Aligning { last_screen } => {
                self.camera.nudge_overlay(screen.x - last_screen.x, screen.y - last_screen.y);
                self.input = InputState::Aligning { last_screen: screen };
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        self.ui.cursor_screen = Some(screen);
        let rect = self.image_rect();

        match std::mem::take(&mut self.input) {
            InputState::Idle | InputState::Aligning { .. } => Vec::new(),
            InputState::Panning { .. } => vec![Action::SetCursor(self.idle_cursor().into())],
            InputState::Selecting { start, .. } => {
                let end = screen_to_model(screen, rect);
                if model_distance(start, end) > BOX_DRAG_THRESHOLD_PCT {
                    self.add_annotation(NewAnnotation::rect_between(start, end))
                } else {
                    self.add_annotation(NewAnnotation::pin(start))
                }
            }
            InputState::Measuring { start, .. } => {
                let end = screen_to_model(screen, rect);
                if model_distance(start, end) > RULER_MIN_LENGTH_PCT {
                    self.add_annotation(NewAnnotation::measure(start, end))
                } else {
                    vec![Action::RenderNeeded]
                }
            }
            InputState::MovingAnnotation { .. } | InputState::ResizingAnnotation { .. } => vec![
                Action::ReleasePointer,
                Action::SetCursor(self.idle_cursor().into()),
                Action::RenderNeeded,
            ],
        }
    }

    /// Wheel always zooms; the host prevents the page from scrolling.
    pub fn on_wheel(&mut self, _screen: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        if delta.dy < 0.0 {
            self.camera.zoom_in();
        } else {
            self.camera.zoom_out();
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        if self.ui.text_focus {
            return Vec::new();
        }
        if key.is_space() {
            self.ui.space_held = true;
            return vec![Action::SetCursor("grab".into())];
        }
        if !modifiers.command() {
            return Vec::new();
        }
        match key.0.as_str() {
            "+" | "=" => {
                self.camera.zoom_in();
                vec![Action::RenderNeeded]
            }
            "-" | "_" => {
                self.camera.zoom_out();
                vec![Action::RenderNeeded]
            }
            "0" => {
                self.camera.reset(self.config.default_zoom);
                vec![Action::RenderNeeded]
            }
            "z" | "Z" if !modifiers.shift => self.undo(),
            _ => Vec::new(),
        }
    }

    pub fn on_key_up(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        if key.is_space() && self.ui.space_held {
            self.ui.space_held = false;
            return vec![Action::SetCursor(self.idle_cursor().into())];
        }
        Vec::new()
    }

    // --- Gesture helpers ---

    fn pointer_down(&mut self, screen: Point) -> Vec<Action> {
        let Some(dev_image_id) = self.active_dev_image_id() else {
            return Vec::new();
        };
        let rect = self.image_rect();
        let active = self.active_annotation_id();
        let hit = self
            .doc
            .active_project()
            .and_then(|p| hit::hit_test(screen, p, &dev_image_id, rect, active));

        match hit {
            Some(Hit { annotation_id, part: HitPart::ResizeHandle }) => {
                let size = self
                    .doc
                    .active_project()
                    .and_then(|p| p.annotation(&annotation_id))
                    .map(|a| a.shape());
                let Some(Shape::Box { width, height }) = size else {
                    return Vec::new();
                };
                self.checkpoint();
                self.input = InputState::ResizingAnnotation {
                    id: annotation_id,
                    start_screen: screen,
                    orig_w: width,
                    orig_h: height,
                };
                vec![Action::CapturePointer, Action::SetCursor("nwse-resize".into())]
            }
            Some(Hit { annotation_id, part: HitPart::Body }) => {
                let origin = self
                    .doc
                    .active_project()
                    .and_then(|p| p.annotation(&annotation_id))
                    .map(|a| (a.x, a.y));
                let Some((orig_x, orig_y)) = origin else {
                    return Vec::new();
                };
                self.ui.selection = Some(Selection::Annotation(annotation_id));
                self.checkpoint();
                self.input = InputState::MovingAnnotation { id: annotation_id, start_screen: screen, orig_x, orig_y };
                vec![
                    self.selection_changed(),
                    Action::CapturePointer,
                    Action::SetCursor("move".into()),
                    Action::RenderNeeded,
                ]
            }
            Some(Hit { annotation_id, part: HitPart::Marker }) => self.select_annotation(&annotation_id),
            None => match self.model_point_inside(screen) {
                Some(start) => {
                    self.input = InputState::Selecting { start, current: start };
                    vec![Action::RenderNeeded]
                }
                None => Vec::new(),
            },
        }
    }

    fn model_point_inside(&self, screen: Point) -> Option<Point> {
        self.active_dev_image_id()?;
        let rect = self.image_rect();
        rect.contains(screen).then(|| screen_to_model(screen, rect))
    }

    fn refresh_hover_sample(&mut self, screen: Point) {
        let rect = self.image_rect();
        self.ui.hover_sample = match self.active_dev_image_id() {
            Some(dev_image_id) if rect.contains(screen) => {
                self.sampler.sample(&dev_image_id, screen_to_model(screen, rect))
            }
            _ => None,
        };
    }

    fn commit_color_sample(&mut self, screen: Point) -> Vec<Action> {
        let Some(dev_image_id) = self.active_dev_image_id() else {
            return Vec::new();
        };
        let Some(model) = self.model_point_inside(screen) else {
            return Vec::new();
        };
        let Some(sample) = self.sampler.sample(&dev_image_id, model) else {
            warn!("color picker: pixels for {dev_image_id} not loaded yet");
            return Vec::new();
        };
        self.add_annotation(NewAnnotation::color(model, &sample.hex))
    }

    fn idle_cursor(&self) -> &'static str {
        if self.ui.space_held { "grab" } else { tool_cursor(self.ui.tool) }
    }
}

fn tool_cursor(tool: Tool) -> &'static str {
    match tool {
        Tool::Pointer => "default",
        Tool::Hand => "grab",
        Tool::Ruler | Tool::ColorPicker => "crosshair",
        Tool::Aligner => "move",
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given overlay canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, config: EngineConfig) -> Self {
        Self { canvas, core: EngineCore::with_config(config) }
    }

    /// Update viewport dimensions and device pixel ratio, resizing the backing store.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css);
        self.core.dpr = dpr;
        self.canvas.set_width((width_css * dpr).round().max(0.0) as u32);
        self.canvas.set_height((height_css * dpr).round().max(0.0) as u32);
    }

    /// Decode `image` into the color picker's pixel store.
    ///
    /// Draws the image onto a detached canvas at its natural size and reads the
    /// pixels back. Call after the image's `load` event.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the detached canvas cannot be created or read.
    pub fn load_dev_image_pixels(&mut self, dev_image_id: DevImageId, image: &HtmlImageElement) -> Result<(), JsValue> {
        let width = image.natural_width();
        let height = image.natural_height();
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("document unavailable"))?;
        let offscreen: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        offscreen.set_width(width);
        offscreen.set_height(height);

        let ctx = context_2d(&offscreen)?;
        ctx.draw_image_with_html_image_element(image, 0.0, 0.0)?;
        let data = ctx
            .get_image_data(0.0, 0.0, f64::from(width), f64::from(height))?
            .data()
            .0;
        let pixels = PixelBuffer::new(width, height, data).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.core.load_pixels(dev_image_id, pixels);
        Ok(())
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    pub fn on_key_up(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_up(key, modifiers)
    }

    // --- Render ---

    /// Draw the overlay layer for the current state.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = context_2d(&self.canvas)?;
        render::draw(&ctx, &self.core)
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}
