//! Viewport camera and the model/screen coordinate mapping.
//!
//! Two coordinate systems meet here. **Model space** is percentages (0–100) of
//! the dev image's own bounds; annotations live there and never change when the
//! user pans or zooms. **Screen space** is CSS pixels inside the comparison
//! viewport. The camera produces the on-screen rectangle of the image, and the
//! free functions below convert through that rectangle and nothing else.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};

/// A point in either screen or model space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are strictly positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Screen-space bounding rectangle of the rendered dev image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Whether `screen` falls inside the rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, screen: Point) -> bool {
        screen.x >= self.left
            && screen.x <= self.left + self.width
            && screen.y >= self.top
            && screen.y <= self.top + self.height
    }
}

/// Convert a screen point to model percentages, clamped to `[0, 100]`.
///
/// A degenerate rect maps every point to the origin.
#[must_use]
pub fn screen_to_model(screen: Point, rect: Rect) -> Point {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Point::default();
    }
    Point {
        x: ((screen.x - rect.left) / rect.width * 100.0).clamp(0.0, 100.0),
        y: ((screen.y - rect.top) / rect.height * 100.0).clamp(0.0, 100.0),
    }
}

/// Convert model percentages back to a screen point. Not clamped.
#[must_use]
pub fn model_to_screen(model: Point, rect: Rect) -> Point {
    Point {
        x: rect.left + model.x / 100.0 * rect.width,
        y: rect.top + model.y / 100.0 * rect.height,
    }
}

/// Convert a screen-space delta to a model-space delta. Not clamped.
#[must_use]
pub fn screen_delta_to_model(dx: f64, dy: f64, rect: Rect) -> Point {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Point::default();
    }
    Point { x: dx / rect.width * 100.0, y: dy / rect.height * 100.0 }
}

/// Euclidean distance between two model points, in percentage units.
#[must_use]
pub fn model_distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Length of the segment `a`–`b` in source pixels of an image of `natural` size.
#[must_use]
pub fn measure_length_px(a: Point, b: Point, natural: Size) -> f64 {
    let dx = (b.x - a.x) / 100.0 * natural.width;
    let dy = (b.y - a.y) / 100.0 * natural.height;
    dx.hypot(dy)
}

/// Camera state for pan/zoom on the comparison canvas.
///
/// The image is centred in the viewport and scaled about its centre; `pan_x` /
/// `pan_y` (CSS pixels) are applied after scaling. `overlay_offset` nudges the
/// translucent design image in overlay mode and is expressed in unscaled image
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
    pub overlay_offset: Point,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0, overlay_offset: Point::default() }
    }
}

impl Camera {
    /// Camera at the given zoom with no pan.
    #[must_use]
    pub fn with_zoom(zoom: f64) -> Self {
        Self { zoom: clamp_zoom(zoom), ..Self::default() }
    }

    /// On-screen rectangle of an image laid out at `image` size inside `viewport`.
    #[must_use]
    pub fn image_rect(&self, viewport: Size, image: Size) -> Rect {
        let width = image.width * self.zoom;
        let height = image.height * self.zoom;
        Rect {
            left: (viewport.width - width) / 2.0 + self.pan_x,
            top: (viewport.height - height) / 2.0 + self.pan_y,
            width,
            height,
        }
    }

    /// Set the zoom, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    /// Restore `zoom` and move the pan back to the origin.
    pub fn reset(&mut self, zoom: f64) {
        self.set_zoom(zoom);
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// Translate by a raw screen delta. Pan speed does not depend on zoom.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Move the overlay image by a screen delta, converted to image pixels.
    pub fn nudge_overlay(&mut self, dx: f64, dy: f64) {
        self.overlay_offset.x += dx / self.zoom;
        self.overlay_offset.y += dy / self.zoom;
    }

    /// Zoom to `focus_zoom` and pan so the model point `center` sits at the
    /// viewport centre.
    pub fn frame(&mut self, center: Point, image: Size, focus_zoom: f64) {
        self.set_zoom(focus_zoom);
        self.pan_x = (50.0 - center.x) / 100.0 * image.width * self.zoom;
        self.pan_y = (50.0 - center.y) / 100.0 * image.height * self.zoom;
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        MIN_ZOOM
    }
}
