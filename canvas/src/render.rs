//! Rendering: draws the annotation overlay to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! The design and dev images themselves are ordinary `<img>` elements laid out
//! by the host; this layer sits on top of the dev image and draws annotations,
//! gesture previews and the color picker magnifier in screen space.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::{Point, Rect, Size, measure_length_px, model_distance, model_to_screen};
use crate::consts::{BOX_DRAG_THRESHOLD_PCT, HANDLE_RADIUS_PX, MAGNIFIER_PREVIEW_PX, RULER_MIN_LENGTH_PCT};
use crate::doc::{Annotation, AnnotationKind, DevImageId, Shape};
use crate::engine::EngineCore;
use crate::hit;
use crate::input::InputState;
use crate::sampler::ColorSample;

const MANUAL_COLOR: &str = "#EF4444";
const AI_COLOR: &str = "#F59E0B";
const MEASURE_COLOR: &str = "#3B82F6";
const ACTIVE_COLOR: &str = "#1E90FF";
const LABEL_FONT: &str = "12px sans-serif";

/// Dash segment length for previews, in screen pixels.
const DASH_PX: f64 = 4.0;
/// Radius of pin and swatch markers.
const MARKER_RADIUS_PX: f64 = 6.0;
/// Gap between the pointer and the magnifier.
const MAGNIFIER_OFFSET_PX: f64 = 20.0;

/// Draw the overlay: annotations on the active dev image, the active
/// annotation's highlight and handle, any drag preview, and the magnifier.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, core: &EngineCore) -> Result<(), JsValue> {
    ctx.set_transform(core.dpr, 0.0, 0.0, core.dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, core.viewport.width, core.viewport.height);

    let Some(project) = core.doc.active_project() else {
        return Ok(());
    };
    let Some(dev_image_id) = core.active_dev_image_id() else {
        return Ok(());
    };
    let rect = core.image_rect();
    let active = core.active_annotation_id();

    // Layer 1: annotations in creation order.
    for ann in project.annotations_on(&dev_image_id) {
        draw_annotation(ctx, ann, rect, active == Some(ann.id))?;
    }

    // Layer 2: resize handle of the active box.
    if let Some(ann) = active.and_then(|id| project.annotation(&id)) {
        if let Some(handle) = hit::resize_handle(ann, rect) {
            draw_handle(ctx, handle)?;
        }
    }

    // Layer 3: gesture preview.
    match core.input {
        InputState::Selecting { start, current } if model_distance(start, current) > BOX_DRAG_THRESHOLD_PCT => {
            draw_selection_preview(ctx, start, current, rect)?;
        }
        InputState::Measuring { start, current } if model_distance(start, current) > RULER_MIN_LENGTH_PCT => {
            let natural = natural_size(core, &dev_image_id);
            draw_ruler_preview(ctx, start, current, rect, natural)?;
        }
        _ => {}
    }

    // Layer 4: magnifier follows the pointer.
    if let (Some(sample), Some(cursor)) = (&core.ui.hover_sample, core.ui.cursor_screen) {
        draw_magnifier(ctx, sample, cursor)?;
    }

    Ok(())
}

/// Natural pixel size for length labels; falls back to the layout size until
/// the image's pixels have been decoded.
fn natural_size(core: &EngineCore, dev_image_id: &DevImageId) -> Size {
    core.sampler
        .natural_size(dev_image_id)
        .unwrap_or(core.image_size)
}

// =============================================================
// Annotations
// =============================================================

fn draw_annotation(ctx: &CanvasRenderingContext2d, ann: &Annotation, rect: Rect, active: bool) -> Result<(), JsValue> {
    let origin = model_to_screen(Point::new(ann.x, ann.y), rect);
    let stroke = if active { ACTIVE_COLOR } else { kind_color(ann) };

    ctx.save();
    ctx.set_line_width(if active { 3.0 } else { 2.0 });
    ctx.set_stroke_style_str(stroke);

    match ann.shape() {
        Shape::Box { width, height } => {
            let corner = model_to_screen(Point::new(ann.x + width, ann.y + height), rect);
            let (w, h) = (corner.x - origin.x, corner.y - origin.y);
            ctx.set_fill_style_str(if active { "rgba(30, 144, 255, 0.12)" } else { "rgba(239, 68, 68, 0.08)" });
            ctx.fill_rect(origin.x, origin.y, w, h);
            ctx.stroke_rect(origin.x, origin.y, w, h);
            draw_label(ctx, &ann.text, Point::new(origin.x, origin.y - 4.0), stroke)?;
        }
        Shape::Pin => {
            ctx.begin_path();
            ctx.arc(origin.x, origin.y, MARKER_RADIUS_PX, 0.0, 2.0 * PI)?;
            ctx.set_fill_style_str(stroke);
            ctx.fill();
            draw_label(ctx, &ann.text, Point::new(origin.x + MARKER_RADIUS_PX + 4.0, origin.y + 4.0), stroke)?;
        }
        Shape::Swatch => {
            ctx.begin_path();
            ctx.arc(origin.x, origin.y, MARKER_RADIUS_PX, 0.0, 2.0 * PI)?;
            ctx.set_fill_style_str(ann.color.as_deref().unwrap_or("#000"));
            ctx.fill();
            ctx.set_stroke_style_str(if active { ACTIVE_COLOR } else { "#fff" });
            ctx.stroke();
            draw_label(ctx, &ann.text, Point::new(origin.x + MARKER_RADIUS_PX + 4.0, origin.y + 4.0), "#111")?;
        }
        Shape::Measure { end } => {
            let end = model_to_screen(end, rect);
            draw_segment(ctx, origin, end)?;
        }
    }

    ctx.restore();
    Ok(())
}

fn kind_color(ann: &Annotation) -> &'static str {
    match ann.kind {
        AnnotationKind::Manual | AnnotationKind::Color => MANUAL_COLOR,
        AnnotationKind::Ai => AI_COLOR,
        AnnotationKind::Measure => MEASURE_COLOR,
    }
}

/// Line with round end caps.
fn draw_segment(ctx: &CanvasRenderingContext2d, a: Point, b: Point) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.move_to(a.x, a.y);
    ctx.line_to(b.x, b.y);
    ctx.stroke();
    for p in [a, b] {
        ctx.begin_path();
        ctx.arc(p.x, p.y, 3.0, 0.0, 2.0 * PI)?;
        ctx.stroke();
    }
    Ok(())
}

fn draw_label(ctx: &CanvasRenderingContext2d, text: &str, at: Point, color: &str) -> Result<(), JsValue> {
    if text.is_empty() {
        return Ok(());
    }
    ctx.set_font(LABEL_FONT);
    ctx.set_fill_style_str(color);
    ctx.fill_text(text, at.x, at.y)
}

fn draw_handle(ctx: &CanvasRenderingContext2d, at: Point) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str("#fff");
    ctx.set_stroke_style_str(ACTIVE_COLOR);
    ctx.set_line_width(1.5);
    ctx.begin_path();
    ctx.arc(at.x, at.y, HANDLE_RADIUS_PX / 2.0, 0.0, 2.0 * PI)?;
    ctx.fill();
    ctx.stroke();
    ctx.restore();
    Ok(())
}

// =============================================================
// Gesture previews
// =============================================================

fn set_dashed(ctx: &CanvasRenderingContext2d, dashed: bool) -> Result<(), JsValue> {
    let pattern = js_sys::Array::new();
    if dashed {
        pattern.push(&DASH_PX.into());
        pattern.push(&DASH_PX.into());
    }
    ctx.set_line_dash(&pattern)
}

fn draw_selection_preview(ctx: &CanvasRenderingContext2d, start: Point, current: Point, rect: Rect) -> Result<(), JsValue> {
    let a = model_to_screen(start, rect);
    let b = model_to_screen(current, rect);
    ctx.save();
    set_dashed(ctx, true)?;
    ctx.set_stroke_style_str(MANUAL_COLOR);
    ctx.set_fill_style_str("rgba(239, 68, 68, 0.12)");
    ctx.set_line_width(1.5);
    let (x, y) = (a.x.min(b.x), a.y.min(b.y));
    let (w, h) = ((b.x - a.x).abs(), (b.y - a.y).abs());
    ctx.fill_rect(x, y, w, h);
    ctx.stroke_rect(x, y, w, h);
    set_dashed(ctx, false)?;
    ctx.restore();
    Ok(())
}

fn draw_ruler_preview(
    ctx: &CanvasRenderingContext2d,
    start: Point,
    current: Point,
    rect: Rect,
    natural: Size,
) -> Result<(), JsValue> {
    let a = model_to_screen(start, rect);
    let b = model_to_screen(current, rect);
    ctx.save();
    ctx.set_stroke_style_str(MEASURE_COLOR);
    ctx.set_line_width(2.0);
    draw_segment(ctx, a, b)?;

    let label = format!("{:.0}px", measure_length_px(start, current, natural));
    let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    ctx.set_font(LABEL_FONT);
    let width = ctx.measure_text(&label).map_or(40.0, |m| m.width());
    ctx.set_fill_style_str("rgba(17, 24, 39, 0.85)");
    ctx.fill_rect(mid.x - width / 2.0 - 4.0, mid.y - 20.0, width + 8.0, 16.0);
    ctx.set_fill_style_str("#fff");
    ctx.fill_text(&label, mid.x - width / 2.0, mid.y - 8.0)?;
    ctx.restore();
    Ok(())
}

// =============================================================
// Magnifier
// =============================================================

fn draw_magnifier(ctx: &CanvasRenderingContext2d, sample: &ColorSample, cursor: Point) -> Result<(), JsValue> {
    let size = sample.magnifier.size;
    if size == 0 {
        return Ok(());
    }
    let cell = MAGNIFIER_PREVIEW_PX / f64::from(size);
    let left = cursor.x + MAGNIFIER_OFFSET_PX;
    let top = cursor.y + MAGNIFIER_OFFSET_PX;

    ctx.save();
    ctx.set_fill_style_str("#fff");
    ctx.fill_rect(left - 2.0, top - 2.0, MAGNIFIER_PREVIEW_PX + 4.0, MAGNIFIER_PREVIEW_PX + 24.0);

    for row in 0..size {
        for col in 0..size {
            let Some(rgba) = sample.magnifier.cell(col, row) else {
                continue;
            };
            let style = format!("rgba({}, {}, {}, {:.3})", rgba.r, rgba.g, rgba.b, f64::from(rgba.a) / 255.0);
            ctx.set_fill_style_str(&style);
            ctx.fill_rect(left + f64::from(col) * cell, top + f64::from(row) * cell, cell, cell);
        }
    }

    // Outline the sampled pixel.
    let center = f64::from(size / 2);
    ctx.set_stroke_style_str("#111");
    ctx.set_line_width(1.0);
    ctx.stroke_rect(left + center * cell, top + center * cell, cell, cell);
    ctx.stroke_rect(left, top, MAGNIFIER_PREVIEW_PX, MAGNIFIER_PREVIEW_PX);

    ctx.set_font(LABEL_FONT);
    ctx.set_fill_style_str("#111");
    ctx.fill_text(&sample.hex, left + 4.0, top + MAGNIFIER_PREVIEW_PX + 16.0)?;
    ctx.restore();
    Ok(())
}
