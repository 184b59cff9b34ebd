#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{AnnotationKind, MANUAL_ISSUE_TITLE, Severity};
use crate::ingest::parse_findings;

// Viewport and image are both 1000x1000 at zoom 1, so the image rect is
// (0, 0, 1000, 1000) and 1% of the image is 10 screen pixels.
fn engine() -> EngineCore {
    let mut core = EngineCore::new();
    core.set_viewport(1000.0, 1000.0);
    core.set_image_size(1000.0, 1000.0);
    core.add_project("首页");
    core.upload_design_image("design".into());
    core.upload_dev_image("dev.png", "dev".into()).unwrap();
    core.history.clear();
    core
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn no_mods() -> Modifiers {
    Modifiers::default()
}

fn ctrl() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

fn key(k: &str) -> Key {
    Key(k.to_string())
}

fn drag(core: &mut EngineCore, from: Point, to: Point) -> Vec<Action> {
    core.on_pointer_down(from, Button::Primary, no_mods());
    core.on_pointer_move(to, no_mods());
    core.on_pointer_up(to, Button::Primary, no_mods())
}

fn annotations(core: &EngineCore) -> &[crate::doc::Annotation] {
    &core.doc.active_project().unwrap().annotations
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn created(actions: &[Action]) -> Option<(AnnotationId, IssueId)> {
    actions.iter().find_map(|a| match a {
        Action::AnnotationCreated { annotation_id, issue_id } => Some((*annotation_id, *issue_id)),
        _ => None,
    })
}

fn solid_pixels(width: u32, height: u32, rgba: [u8; 4]) -> PixelBuffer {
    let data = rgba.repeat((width * height) as usize);
    PixelBuffer::new(width, height, data).unwrap()
}

// =============================================================
// Pointer tool: boxes and pins
// =============================================================

#[test]
fn drag_creates_box() {
    let mut core = engine();
    let actions = drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    assert!(created(&actions).is_some());

    let ann = &annotations(&core)[0];
    assert_eq!(ann.kind, AnnotationKind::Manual);
    assert!(approx(ann.x, 10.0) && approx(ann.y, 10.0));
    assert!(approx(ann.width.unwrap(), 30.0) && approx(ann.height.unwrap(), 20.0));
}

#[test]
fn reverse_drag_creates_same_box() {
    let mut core = engine();
    drag(&mut core, pt(400.0, 300.0), pt(100.0, 100.0));
    let ann = &annotations(&core)[0];
    assert!(approx(ann.x, 10.0) && approx(ann.y, 10.0));
    assert!(approx(ann.width.unwrap(), 30.0) && approx(ann.height.unwrap(), 20.0));
}

#[test]
fn box_scenario_creates_open_medium_issue() {
    let mut core = engine();
    let actions = drag(&mut core, pt(50.0, 50.0), pt(250.0, 150.0));
    let (ann_id, issue_id) = created(&actions).unwrap();

    let project = core.doc.active_project().unwrap();
    let ann = project.annotation(&ann_id).unwrap();
    assert!(approx(ann.x, 5.0) && approx(ann.y, 5.0));
    assert!(approx(ann.width.unwrap(), 20.0) && approx(ann.height.unwrap(), 10.0));

    let issue = project.issue(&issue_id).unwrap();
    assert_eq!(issue.title, MANUAL_ISSUE_TITLE);
    assert_eq!(issue.status, IssueStatus::Open);
    assert_eq!(issue.severity, Severity::Medium);
    assert_eq!(issue.annotation_id, Some(ann_id));
    assert_eq!(core.active_issue_id(), Some(issue_id));
    assert_eq!(core.active_annotation_id(), Some(ann_id));
}

#[test]
fn click_creates_pin() {
    let mut core = engine();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_mods());
    core.on_pointer_up(pt(102.0, 101.0), Button::Primary, no_mods());

    // placed where the press landed
    let ann = &annotations(&core)[0];
    assert!(ann.width.is_none() && ann.height.is_none());
    assert!(approx(ann.x, 10.0) && approx(ann.y, 10.0));
}

#[test]
fn press_outside_image_does_nothing() {
    let mut core = engine();
    core.set_image_size(500.0, 500.0);
    // image rect is (250, 250, 500, 500)
    drag(&mut core, pt(100.0, 100.0), pt(200.0, 200.0));
    assert!(annotations(&core).is_empty());
    assert!(core.history.is_empty());
}

#[test]
fn no_dev_image_means_no_annotation() {
    let mut core = EngineCore::new();
    core.set_viewport(1000.0, 1000.0);
    core.set_image_size(1000.0, 1000.0);
    core.add_project("empty");
    core.history.clear();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    assert!(core.doc.active_project().unwrap().annotations.is_empty());
    assert!(core.history.is_empty());
}

// =============================================================
// Move / resize
// =============================================================

#[test]
fn move_drag_pushes_one_snapshot() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    assert_eq!(core.history.len(), 1);
    let id = annotations(&core)[0].id;

    let down = core.on_pointer_down(pt(200.0, 200.0), Button::Primary, no_mods());
    assert!(down.contains(&Action::CapturePointer));
    core.on_pointer_move(pt(250.0, 220.0), no_mods());
    core.on_pointer_move(pt(300.0, 250.0), no_mods());
    let up = core.on_pointer_up(pt(300.0, 250.0), Button::Primary, no_mods());
    assert!(up.contains(&Action::ReleasePointer));

    assert_eq!(core.history.len(), 2);
    let ann = &annotations(&core)[0];
    assert_eq!(ann.id, id);
    assert!(approx(ann.x, 20.0) && approx(ann.y, 15.0));
    assert!(approx(ann.width.unwrap(), 30.0));
}

#[test]
fn move_then_undo_restores_position() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    drag(&mut core, pt(200.0, 200.0), pt(500.0, 500.0));
    core.undo();
    let ann = &annotations(&core)[0];
    assert!(approx(ann.x, 10.0) && approx(ann.y, 10.0));
}

#[test]
fn resize_handle_grows_box() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    // handle at the bottom-right corner (400, 300) of the selected box
    drag(&mut core, pt(400.0, 300.0), pt(500.0, 400.0));

    let ann = &annotations(&core)[0];
    assert!(approx(ann.x, 10.0) && approx(ann.y, 10.0));
    assert!(approx(ann.width.unwrap(), 40.0) && approx(ann.height.unwrap(), 30.0));
    assert_eq!(core.history.len(), 2);
}

#[test]
fn pan_press_during_move_releases_pointer() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));

    let down = core.on_pointer_down(pt(200.0, 200.0), Button::Primary, no_mods());
    assert!(down.contains(&Action::CapturePointer));
    let middle = core.on_pointer_down(pt(210.0, 210.0), Button::Middle, no_mods());
    assert!(middle.contains(&Action::ReleasePointer));
    assert!(matches!(core.input, InputState::Panning { .. }));

    let up = core.on_pointer_up(pt(220.0, 220.0), Button::Middle, no_mods());
    assert!(!up.contains(&Action::ReleasePointer));
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn space_press_during_resize_releases_pointer() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));

    let down = core.on_pointer_down(pt(400.0, 300.0), Button::Primary, no_mods());
    assert!(matches!(core.input, InputState::ResizingAnnotation { .. }));
    assert!(down.contains(&Action::CapturePointer));
    core.on_key_down(key(" "), no_mods());
    let again = core.on_pointer_down(pt(400.0, 300.0), Button::Primary, no_mods());
    assert_eq!(again.iter().filter(|a| **a == Action::ReleasePointer).count(), 1);
    assert!(matches!(core.input, InputState::Panning { .. }));
}

#[test]
fn plain_press_when_idle_releases_nothing() {
    let mut core = engine();
    let down = core.on_pointer_down(pt(100.0, 100.0), Button::Middle, no_mods());
    assert!(!down.contains(&Action::ReleasePointer));
}

#[test]
fn resize_never_shrinks_below_floor() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    drag(&mut core, pt(400.0, 300.0), pt(0.0, 0.0));

    let ann = &annotations(&core)[0];
    assert_eq!(ann.width, Some(MIN_BOX_SIZE_PCT));
    assert_eq!(ann.height, Some(MIN_BOX_SIZE_PCT));
}

#[test]
fn click_on_pin_selects_without_history() {
    let mut core = engine();
    core.on_pointer_down(pt(500.0, 500.0), Button::Primary, no_mods());
    core.on_pointer_up(pt(500.0, 500.0), Button::Primary, no_mods());
    let pin = annotations(&core)[0].id;
    core.clear_selection();
    let history = core.history.len();

    core.on_pointer_down(pt(503.0, 502.0), Button::Primary, no_mods());
    core.on_pointer_up(pt(503.0, 502.0), Button::Primary, no_mods());
    assert_eq!(core.active_annotation_id(), Some(pin));
    assert_eq!(annotations(&core).len(), 1);
    assert_eq!(core.history.len(), history);
}

// =============================================================
// Undo
// =============================================================

#[test]
fn undo_restores_initial_state() {
    let mut core = engine();
    let initial = core.doc.snapshot();
    for i in 0..5 {
        let x = f64::from(i) * 100.0 + 50.0;
        drag(&mut core, pt(x, 100.0), pt(x + 40.0, 140.0));
    }
    assert_eq!(annotations(&core).len(), 5);
    for _ in 0..5 {
        core.undo();
    }
    assert_eq!(core.doc.snapshot(), initial);
    assert!(core.undo().is_empty());
}

#[test]
fn history_keeps_twenty_steps() {
    let mut core = engine();
    for i in 0..21 {
        let x = f64::from(i) * 40.0 + 10.0;
        core.on_pointer_down(pt(x, 500.0), Button::Primary, no_mods());
        core.on_pointer_up(pt(x, 500.0), Button::Primary, no_mods());
    }
    assert_eq!(annotations(&core).len(), 21);
    for _ in 0..20 {
        assert!(!core.undo().is_empty());
    }
    assert_eq!(annotations(&core).len(), 1);
    let before = core.doc.snapshot();
    assert!(core.undo().is_empty());
    assert_eq!(core.doc.snapshot(), before);
}

#[test]
fn undo_clears_dangling_selection() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    assert!(core.active_issue_id().is_some());
    core.undo();
    assert!(core.ui.selection.is_none());
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn ctrl_z_undoes_but_not_with_shift() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));

    let shifted = Modifiers { ctrl: true, shift: true, ..Default::default() };
    core.on_key_down(key("Z"), shifted);
    assert_eq!(annotations(&core).len(), 1);

    core.on_key_down(key("z"), ctrl());
    assert!(annotations(&core).is_empty());
}

#[test]
fn meta_z_undoes() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    core.on_key_down(key("z"), Modifiers { meta: true, ..Default::default() });
    assert!(annotations(&core).is_empty());
}

// =============================================================
// Issues
// =============================================================

#[test]
fn delete_issue_cascades_and_clears_selection() {
    let mut core = engine();
    let (ann_id, issue_id) = created(&drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0))).unwrap();

    let actions = core.delete_issue(&issue_id);
    assert!(actions.contains(&Action::IssueDeleted { id: issue_id, annotation_id: Some(ann_id) }));
    assert!(annotations(&core).is_empty());
    assert!(core.ui.selection.is_none());

    core.undo();
    assert_eq!(annotations(&core).len(), 1);
}

#[test]
fn issue_edits_are_not_undoable() {
    let mut core = engine();
    let (_, issue_id) = created(&drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0))).unwrap();
    let history = core.history.len();

    core.set_issue_status(&issue_id, IssueStatus::Resolved);
    core.add_comment(&issue_id, "已修复");
    assert_eq!(core.history.len(), history);

    let issue = core.doc.active_project().unwrap().issue(&issue_id).unwrap();
    assert_eq!(issue.status, IssueStatus::Resolved);
    assert_eq!(issue.comments.len(), 1);
}

#[test]
fn select_issue_frames_annotation() {
    let mut core = engine();
    // box 20..30 x 10..30 -> centre (25, 20)
    let (_, issue_id) = created(&drag(&mut core, pt(200.0, 100.0), pt(300.0, 300.0))).unwrap();
    core.clear_selection();

    core.select_issue(&issue_id);
    assert_eq!(core.camera.zoom, FOCUS_ZOOM);
    assert!(approx(core.camera.pan_x, 375.0));
    assert!(approx(core.camera.pan_y, 450.0));
    assert_eq!(core.active_issue_id(), Some(issue_id));
}

#[test]
fn selecting_annotation_resolves_issue() {
    let mut core = engine();
    let (ann_id, issue_id) = created(&drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0))).unwrap();
    core.clear_selection();
    core.select_annotation(&ann_id);
    assert_eq!(core.active_issue_id(), Some(issue_id));
}

// =============================================================
// Ruler
// =============================================================

#[test]
fn ruler_drag_creates_measurement() {
    let mut core = engine();
    core.set_tool(Tool::Ruler);
    let actions = drag(&mut core, pt(100.0, 100.0), pt(400.0, 100.0));
    let (_, issue_id) = created(&actions).unwrap();

    let ann = &annotations(&core)[0];
    assert_eq!(ann.kind, AnnotationKind::Measure);
    assert!(approx(ann.end_x.unwrap(), 40.0));
    assert!(approx(ann.end_y.unwrap(), 10.0));
    let issue = core.doc.active_project().unwrap().issue(&issue_id).unwrap();
    assert_eq!(issue.title, crate::doc::MEASURE_ISSUE_TITLE);
}

#[test]
fn short_ruler_drag_is_discarded() {
    let mut core = engine();
    core.set_tool(Tool::Ruler);
    drag(&mut core, pt(100.0, 100.0), pt(100.5, 100.0));
    assert!(annotations(&core).is_empty());
    assert!(core.history.is_empty());
}

// =============================================================
// Color picker
// =============================================================

#[test]
fn color_click_creates_swatch() {
    let mut core = engine();
    let dev = core.active_dev_image_id().unwrap();
    core.load_pixels(dev, solid_pixels(4, 4, [0xFF, 0x00, 0x80, 0xFF]));
    core.set_tool(Tool::ColorPicker);

    let actions = core.on_pointer_down(pt(500.0, 500.0), Button::Primary, no_mods());
    let (ann_id, issue_id) = created(&actions).unwrap();
    let project = core.doc.active_project().unwrap();
    let ann = project.annotation(&ann_id).unwrap();
    assert_eq!(ann.kind, AnnotationKind::Color);
    assert_eq!(ann.color.as_deref(), Some("#FF0080"));
    assert_eq!(ann.text, "#FF0080");
    assert_eq!(project.issue(&issue_id).unwrap().title, "取色: #FF0080");
}

#[test]
fn color_click_before_pixels_load_is_noop() {
    let mut core = engine();
    core.set_tool(Tool::ColorPicker);
    let actions = core.on_pointer_down(pt(500.0, 500.0), Button::Primary, no_mods());
    assert!(actions.is_empty());
    assert!(annotations(&core).is_empty());
    assert!(core.history.is_empty());
}

#[test]
fn hover_updates_magnifier_sample() {
    let mut core = engine();
    let dev = core.active_dev_image_id().unwrap();
    core.load_pixels(dev, solid_pixels(4, 4, [1, 2, 3, 255]));
    core.set_tool(Tool::ColorPicker);

    core.on_pointer_move(pt(500.0, 500.0), no_mods());
    let sample = core.ui.hover_sample.as_ref().unwrap();
    assert_eq!(sample.hex, "#010203");

    core.set_tool(Tool::Pointer);
    assert!(core.ui.hover_sample.is_none());
}

// =============================================================
// Viewport
// =============================================================

#[test]
fn ctrl_equals_three_times() {
    let mut core = engine();
    for _ in 0..3 {
        core.on_key_down(key("="), ctrl());
    }
    assert!(approx(core.camera.zoom, 1.728));
    core.on_key_down(key("0"), ctrl());
    assert_eq!(core.camera.zoom, DEFAULT_ZOOM);
}

#[test]
fn report_viewer_resets_to_its_own_zoom() {
    let mut core = EngineCore::with_config(EngineConfig::report_viewer());
    assert!(approx(core.camera.zoom, REPORT_DEFAULT_ZOOM));
    core.on_key_down(key("="), ctrl());
    core.on_key_down(key("0"), ctrl());
    assert!(approx(core.camera.zoom, REPORT_DEFAULT_ZOOM));
}

#[test]
fn shortcuts_suppressed_while_typing() {
    let mut core = engine();
    core.set_text_focus(true);
    core.on_key_down(key("="), ctrl());
    core.on_key_down(key(" "), no_mods());
    assert_eq!(core.camera.zoom, 1.0);
    assert!(!core.ui.space_held);
}

#[test]
fn wheel_zooms() {
    let mut core = engine();
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -100.0 }, no_mods());
    assert!(approx(core.camera.zoom, 1.2));
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: 100.0 }, no_mods());
    assert!(approx(core.camera.zoom, 1.0));
}

#[test]
fn space_drag_pans_instead_of_annotating() {
    let mut core = engine();
    core.on_key_down(key(" "), no_mods());
    drag(&mut core, pt(100.0, 100.0), pt(130.0, 120.0));
    assert!(annotations(&core).is_empty());
    assert_eq!((core.camera.pan_x, core.camera.pan_y), (30.0, 20.0));

    core.on_key_up(key(" "), no_mods());
    assert!(!core.ui.space_held);
}

#[test]
fn hand_tool_and_middle_button_pan() {
    let mut core = engine();
    core.set_tool(Tool::Hand);
    drag(&mut core, pt(0.0, 0.0), pt(10.0, 10.0));
    core.set_tool(Tool::Pointer);
    core.on_pointer_down(pt(0.0, 0.0), Button::Middle, no_mods());
    core.on_pointer_move(pt(5.0, 0.0), no_mods());
    core.on_pointer_up(pt(5.0, 0.0), Button::Middle, no_mods());
    assert_eq!((core.camera.pan_x, core.camera.pan_y), (15.0, 10.0));
    assert!(annotations(&core).is_empty());
}

#[test]
fn viewport_changes_are_not_undoable() {
    let mut core = engine();
    core.on_key_down(key("="), ctrl());
    core.set_tool(Tool::Hand);
    drag(&mut core, pt(0.0, 0.0), pt(10.0, 10.0));
    assert!(core.history.is_empty());
}

#[test]
fn aligner_moves_overlay_in_image_pixels() {
    let mut core = engine();
    core.camera.set_zoom(2.0);
    core.set_compare_mode(CompareMode::Overlay);
    core.set_tool(Tool::Aligner);
    drag(&mut core, pt(500.0, 500.0), pt(520.0, 490.0));
    assert_eq!(core.camera.overlay_offset, Point::new(10.0, -5.0));
}

#[test]
fn aligner_inert_side_by_side() {
    let mut core = engine();
    core.set_tool(Tool::Aligner);
    drag(&mut core, pt(500.0, 500.0), pt(520.0, 490.0));
    assert_eq!(core.camera.overlay_offset, Point::default());
}

#[test]
fn set_tool_abandons_gesture() {
    let mut core = engine();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(300.0, 300.0), no_mods());
    core.set_tool(Tool::Hand);
    assert_eq!(core.input, InputState::Idle);
    core.on_pointer_up(pt(300.0, 300.0), Button::Primary, no_mods());
    assert!(annotations(&core).is_empty());
}

// =============================================================
// Projects and images
// =============================================================

#[test]
fn project_ops_are_undoable() {
    let mut core = engine();
    let first = core.doc.active_project_id().unwrap();
    let second = core.add_project("second");
    assert_eq!(core.doc.active_project_id(), Some(second));
    core.undo();
    assert_eq!(core.doc.projects().len(), 1);
    assert_eq!(core.doc.active_project_id(), Some(first));
}

#[test]
fn delete_dev_image_is_undoable() {
    let mut core = engine();
    drag(&mut core, pt(100.0, 100.0), pt(400.0, 300.0));
    let dev = core.active_dev_image_id().unwrap();
    assert!(core.delete_dev_image(&dev));
    assert!(core.active_dev_image_id().is_none());
    assert!(annotations(&core).is_empty());

    core.undo();
    assert_eq!(core.active_dev_image_id(), Some(dev));
    assert_eq!(annotations(&core).len(), 1);
}

// =============================================================
// Analysis
// =============================================================

#[test]
fn analysis_needs_both_images() {
    let mut core = EngineCore::new();
    core.add_project("p");
    core.upload_dev_image("dev", "dev".into());
    assert_eq!(core.begin_analysis(), Err(AnalysisError::MissingImages));
}

#[test]
fn analysis_commit_ingests_findings() {
    let mut core = engine();
    let request = core.begin_analysis().unwrap();
    assert_eq!(&*request.design_image, "design");
    assert_eq!(core.begin_analysis(), Err(AnalysisError::AlreadyRunning));

    core.tick_analysis();
    assert!(core.analysis.progress() > 0.0);

    let findings = parse_findings(r#"[{"title": "按钮", "boundingBox": [100, 200, 400, 600]}, {"title": "字体"}]"#).unwrap();
    core.finish_analysis(Ok(findings));
    assert_eq!(core.analysis.progress(), 100.0);
    assert!(core.history.is_empty());

    core.commit_analysis();
    let project = core.doc.active_project().unwrap();
    assert_eq!(project.issues.len(), 2);
    assert_eq!(project.annotations.len(), 1);
    assert_eq!(project.annotations[0].kind, AnnotationKind::Ai);
    assert!(!core.analysis.is_busy());

    core.undo();
    assert!(core.doc.active_project().unwrap().issues.is_empty());
}

#[test]
fn analysis_failure_alerts_and_leaves_document() {
    let mut core = engine();
    core.begin_analysis().unwrap();
    let before = core.doc.clone();
    let actions = core.finish_analysis(Err("network down".into()));
    assert!(actions.iter().any(|a| matches!(a, Action::Alert(msg) if msg.contains("network down"))));
    assert_eq!(core.doc, before);
    assert!(!core.analysis.is_busy());
    assert!(core.commit_analysis().is_empty());
}

#[test]
fn analysis_for_removed_image_is_dropped() {
    let mut core = engine();
    let request = core.begin_analysis().unwrap();
    core.delete_dev_image(&request.dev_image_id);
    core.finish_analysis(Ok(parse_findings(r#"[{"title": "a"}]"#).unwrap()));
    let actions = core.commit_analysis();
    assert!(matches!(actions.as_slice(), [Action::Alert(_)]));
    assert!(core.doc.active_project().unwrap().issues.is_empty());
}
