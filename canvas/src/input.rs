//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the gesture tracked between pointer-down and
//! pointer-up, carrying what is needed to compute deltas and commit the final
//! mutation on release. `UiState` is the persistent, non-undoable UI state the
//! renderer reads (tool, selection, compare mode, hover sample).

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::doc::{AnnotationId, IssueId, Project};
use crate::sampler::ColorSample;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Select, create, move and resize annotations (default).
    #[default]
    Pointer,
    /// Pan the viewport only.
    Hand,
    /// Drag to measure a distance.
    Ruler,
    /// Click to sample a color.
    ColorPicker,
    /// Drag the translucent design image in overlay mode.
    Aligner,
}

/// How the design and dev images are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    #[default]
    SideBySide,
    /// Design image drawn translucently on top of the dev image.
    Overlay,
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"="`, `" "`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }

    #[must_use]
    pub fn is_space(&self) -> bool {
        self.0 == " " || self.0 == "Space" || self.0 == "Spacebar"
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WheelDelta {
    pub dx: f64,
    /// Vertical scroll amount (positive = down).
    pub dy: f64,
}

/// The current selection: one entity, resolved to the other by lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Annotation(AnnotationId),
    Issue(IssueId),
}

impl Selection {
    /// The selected annotation, directly or through the selected issue's link.
    #[must_use]
    pub fn annotation_id(self, project: &Project) -> Option<AnnotationId> {
        match self {
            Self::Annotation(id) => project.annotation(&id).map(|a| a.id),
            Self::Issue(id) => project.issue(&id).and_then(|i| i.annotation_id),
        }
    }

    /// The selected issue, directly or as the wrapper of the selected annotation.
    #[must_use]
    pub fn issue_id(self, project: &Project) -> Option<IssueId> {
        match self {
            Self::Annotation(id) => project.issue_for_annotation(&id).map(|i| i.id),
            Self::Issue(id) => project.issue(&id).map(|i| i.id),
        }
    }
}

/// Persistent UI state visible to the renderer. Never part of undo history.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub tool: Tool,
    pub selection: Option<Selection>,
    pub compare_mode: CompareMode,
    /// Space bar is held (temporary hand tool).
    pub space_held: bool,
    /// A text input or textarea has focus; global shortcuts are suppressed.
    pub text_focus: bool,
    /// Latest color picker hover sample, for the magnifier.
    pub hover_sample: Option<ColorSample>,
    /// Screen position of the pointer, if over the viewport.
    pub cursor_screen: Option<Point>,
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Translating the viewport.
    Panning {
        /// Screen position at the previous event.
        last_screen: Point,
    },
    /// Pointer-tool drag that will become a box, or a pin if it stays short.
    Selecting {
        /// Model-space press point.
        start: Point,
        /// Model-space latest point.
        current: Point,
    },
    /// Ruler drag that will become a measurement.
    Measuring { start: Point, current: Point },
    /// Dragging an existing box annotation.
    MovingAnnotation {
        id: AnnotationId,
        /// Screen position at pointer-down; deltas are taken from here.
        start_screen: Point,
        orig_x: f64,
        orig_y: f64,
    },
    /// Dragging the resize handle of the active box annotation.
    ResizingAnnotation {
        id: AnnotationId,
        start_screen: Point,
        orig_w: f64,
        orig_h: f64,
    },
    /// Dragging the overlay design image (aligner tool).
    Aligning { last_screen: Point },
}

impl InputState {
    /// Whether a move or resize drag owns the pointer (window listeners live).
    #[must_use]
    pub fn is_annotation_drag(&self) -> bool {
        matches!(self, Self::MovingAnnotation { .. } | Self::ResizingAnnotation { .. })
    }
}
