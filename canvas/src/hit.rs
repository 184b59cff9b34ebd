//! Hit-testing screen points against the annotations of one dev image.
//!
//! Tests run in screen space so that handle slop stays a constant number of
//! pixels at any zoom level. Later annotations are drawn on top, so they are
//! tested first.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Point, Rect, model_to_screen};
use crate::consts::HANDLE_RADIUS_PX;
use crate::doc::{Annotation, AnnotationId, DevImageId, Project, Shape};

/// Which part of an annotation was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    /// Inside a box annotation; starts a move.
    Body,
    /// The bottom-right resize handle of the active box.
    ResizeHandle,
    /// A pin, color swatch, or measurement line; select only.
    Marker,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub annotation_id: AnnotationId,
    pub part: HitPart,
}

/// Screen position of a box annotation's resize handle.
#[must_use]
pub fn resize_handle(ann: &Annotation, rect: Rect) -> Option<Point> {
    let Shape::Box { width, height } = ann.shape() else {
        return None;
    };
    Some(model_to_screen(Point::new(ann.x + width, ann.y + height), rect))
}

/// Find the annotation under `screen`, checking the active annotation's
/// resize handle first.
#[must_use]
pub fn hit_test(
    screen: Point,
    project: &Project,
    dev_image_id: &DevImageId,
    rect: Rect,
    active_id: Option<AnnotationId>,
) -> Option<Hit> {
    if let Some(active) = active_id.and_then(|id| project.annotation(&id)) {
        if &active.dev_image_id == dev_image_id {
            if let Some(handle) = resize_handle(active, rect) {
                if distance(screen, handle) <= HANDLE_RADIUS_PX {
                    return Some(Hit { annotation_id: active.id, part: HitPart::ResizeHandle });
                }
            }
        }
    }

    let annotations: Vec<&Annotation> = project.annotations_on(dev_image_id).collect();
    annotations
        .into_iter()
        .rev()
        .find_map(|ann| hit_annotation(screen, ann, rect).map(|part| Hit { annotation_id: ann.id, part }))
}

fn hit_annotation(screen: Point, ann: &Annotation, rect: Rect) -> Option<HitPart> {
    let origin = model_to_screen(Point::new(ann.x, ann.y), rect);
    match ann.shape() {
        Shape::Box { width, height } => {
            let corner = model_to_screen(Point::new(ann.x + width, ann.y + height), rect);
            let inside = screen.x >= origin.x.min(corner.x)
                && screen.x <= origin.x.max(corner.x)
                && screen.y >= origin.y.min(corner.y)
                && screen.y <= origin.y.max(corner.y);
            inside.then_some(HitPart::Body)
        }
        Shape::Pin | Shape::Swatch => (distance(screen, origin) <= HANDLE_RADIUS_PX).then_some(HitPart::Marker),
        Shape::Measure { end } => {
            let end = model_to_screen(end, rect);
            (distance_to_segment(screen, origin, end) <= HANDLE_RADIUS_PX).then_some(HitPart::Marker)
        }
    }
}

fn distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx.mul_add(dx, dy * dy);
    if len_sq == 0.0 {
        return distance(p, a);
    }
    let t = ((p.x - a.x).mul_add(dx, (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, Point::new(t.mul_add(dx, a.x), t.mul_add(dy, a.y)))
}
