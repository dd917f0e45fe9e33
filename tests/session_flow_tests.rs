use screendraw::geometry::{PagePoint, ViewportPoint};
use screendraw::history::DEFAULT_HISTORY_CAPACITY;
use screendraw::input::GesturePhase;
use screendraw::model::{Annotation, Color, ShapeKind, StrokeKind, Tool};
use screendraw::render::SurfaceSpec;
use screendraw::session::OverlaySession;
use std::time::Duration;

fn attached_session() -> OverlaySession {
    let mut session = OverlaySession::new();
    assert!(session.attach(SurfaceSpec::new(128, 128, 1.0)));
    session
}

fn drag_line(session: &mut OverlaySession, from: (f32, f32), to: (f32, f32), samples: u32) {
    session.begin_gesture(ViewportPoint::new(from.0, from.1));
    for i in 1..=samples {
        let t = i as f32 / samples as f32;
        let x = from.0 + (to.0 - from.0) * t;
        let y = from.1 + (to.1 - from.1) * t;
        session.extend_gesture(ViewportPoint::new(x, y), Duration::from_millis(i as u64 * 20));
    }
    session.end_gesture();
}

#[test]
fn two_strokes_undo_twice_redo_twice_restores_both() {
    let mut session = attached_session();
    drag_line(&mut session, (5.0, 5.0), (40.0, 5.0), 12);
    drag_line(&mut session, (5.0, 20.0), (40.0, 20.0), 12);
    assert_eq!(session.canvas().len(), 2);

    assert!(session.undo());
    assert_eq!(session.canvas().len(), 1);
    assert!(session.undo());
    assert!(session.canvas().is_empty());

    assert!(session.redo());
    assert!(session.redo());
    assert_eq!(session.canvas().len(), 2);
    assert_eq!(session.redo_depth(), 0);
}

#[test]
fn new_stroke_after_undo_invalidates_redo() {
    let mut session = attached_session();
    drag_line(&mut session, (5.0, 5.0), (40.0, 5.0), 8);
    drag_line(&mut session, (5.0, 20.0), (40.0, 20.0), 8);
    assert!(session.undo());
    assert_eq!(session.redo_depth(), 1);

    drag_line(&mut session, (5.0, 40.0), (40.0, 40.0), 8);
    assert_eq!(session.redo_depth(), 0);
    assert!(!session.redo());
    assert_eq!(session.canvas().len(), 2);
}

#[test]
fn heavy_stroke_count_hits_the_undo_floor() {
    let mut session = attached_session();
    for i in 0..25 {
        let y = 2.0 + i as f32 * 4.0;
        drag_line(&mut session, (2.0, y), (30.0, y), 6);
    }
    assert_eq!(session.canvas().len(), 25);
    assert_eq!(session.undo_depth(), DEFAULT_HISTORY_CAPACITY);

    let mut undone = 0;
    while session.undo() {
        undone += 1;
    }
    assert_eq!(undone, DEFAULT_HISTORY_CAPACITY);
    // The oldest snapshots were discarded: five strokes remain unreachable.
    assert_eq!(session.canvas().len(), 5);
}

#[test]
fn committed_stroke_is_simplified_but_keeps_endpoints() {
    let mut session = attached_session();
    drag_line(&mut session, (0.0, 50.0), (100.0, 50.0), 60);

    let stroke = match &session.canvas().annotations[0] {
        Annotation::Stroke(stroke) => stroke,
        other => panic!("unexpected annotation {other:?}"),
    };
    assert!(stroke.points.len() < 61);
    assert_eq!(stroke.points.first(), Some(&PagePoint::new(0.0, 50.0)));
    assert_eq!(stroke.points.last(), Some(&PagePoint::new(100.0, 50.0)));
}

#[test]
fn click_without_movement_leaves_no_annotation() {
    let mut session = attached_session();
    session.begin_gesture(ViewportPoint::new(30.0, 30.0));
    session.end_gesture();
    assert!(session.canvas().is_empty());
    assert_eq!(session.phase(), GesturePhase::Idle);
}

#[test]
fn pointer_leave_commits_like_pointer_up() {
    let mut session = attached_session();
    session.begin_gesture(ViewportPoint::new(5.0, 5.0));
    session.extend_gesture(ViewportPoint::new(25.0, 25.0), Duration::from_millis(30));
    session.pointer_left();
    assert_eq!(session.canvas().len(), 1);
}

#[test]
fn tool_changes_mid_session_apply_to_subsequent_strokes_only() {
    let mut session = attached_session();
    drag_line(&mut session, (5.0, 5.0), (40.0, 5.0), 8);

    session.set_tool(Tool::Eraser);
    drag_line(&mut session, (5.0, 20.0), (40.0, 20.0), 8);

    let kinds: Vec<StrokeKind> = session
        .canvas()
        .annotations
        .iter()
        .map(|a| match a {
            Annotation::Stroke(s) => s.kind,
            other => panic!("unexpected annotation {other:?}"),
        })
        .collect();
    assert_eq!(kinds, vec![StrokeKind::Pen, StrokeKind::Eraser]);
}

#[test]
fn text_flow_commit_and_cancel() {
    let mut session = attached_session();
    session.set_tool(Tool::Text);

    session.begin_gesture(ViewportPoint::new(10.0, 10.0));
    let anchor = session.text_anchor().expect("anchor");
    assert!(session.commit_text(anchor, "first", Color::rgb(0, 0, 0), 16.0));

    session.begin_gesture(ViewportPoint::new(20.0, 20.0));
    session.cancel_text();
    assert_eq!(session.phase(), GesturePhase::Idle);

    assert_eq!(session.canvas().len(), 1);
}

#[test]
fn serialize_restore_replays_to_an_identical_canvas() {
    let mut session = attached_session();
    drag_line(&mut session, (3.0, 3.0), (60.0, 44.0), 20);
    session.set_tool(Tool::Highlighter);
    session.set_color_hex("#f59e0b");
    drag_line(&mut session, (10.0, 60.0), (90.0, 60.0), 20);
    session.commit_text(PagePoint::new(12.0, 80.0), "label", Color::rgb(8, 8, 8), 24.0);

    let bytes = session.serialize_state().expect("serialize");
    let original = session.canvas().clone();

    let mut replica = attached_session();
    replica.restore_state(&bytes).expect("restore");
    assert_eq!(replica.canvas(), &original);

    // Round-trip again to confirm the snapshot is stable byte-for-byte.
    let bytes_again = replica.serialize_state().expect("serialize again");
    assert_eq!(bytes, bytes_again);
}

#[test]
fn detached_session_refuses_history_operations() {
    let mut session = attached_session();
    drag_line(&mut session, (5.0, 5.0), (40.0, 5.0), 8);
    let bytes = session.serialize_state().expect("serialize");
    assert!(session.detach());
    assert!(!session.undo());
    assert!(!session.clear());
    assert!(session.restore_state(&bytes).is_err());
}

#[test]
fn arrow_drag_commits_an_undoable_shape() {
    let mut session = attached_session();
    session.set_tool(Tool::Arrow);
    session.begin_gesture(ViewportPoint::new(10.0, 80.0));
    session.extend_gesture(ViewportPoint::new(70.0, 20.0), Duration::from_millis(20));
    session.end_gesture();

    let shape = match &session.canvas().annotations[0] {
        Annotation::Shape(shape) => shape,
        other => panic!("unexpected annotation {other:?}"),
    };
    assert_eq!(shape.kind, ShapeKind::Arrow);
    assert_eq!(shape.start, PagePoint::new(10.0, 80.0));
    assert_eq!(shape.end, PagePoint::new(70.0, 20.0));

    assert!(session.undo());
    assert!(session.canvas().is_empty());
    assert!(session.redo());
    assert_eq!(session.canvas().len(), 1);
}
