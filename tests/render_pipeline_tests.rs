use screendraw::geometry::{PagePoint, ScrollOffset, ViewportPoint};
use screendraw::model::{Annotation, Color, PageCanvas, Stroke, StrokeKind, Tool};
use screendraw::render::{render_canvas_to_rgba, SurfaceSpec};
use screendraw::session::OverlaySession;
use std::time::Duration;

const SIZE: u32 = 64;

fn surface() -> SurfaceSpec {
    SurfaceSpec::new(SIZE, SIZE, 1.0)
}

fn pen_stroke(points: Vec<PagePoint>) -> Annotation {
    Annotation::Stroke(Stroke {
        points,
        color: Color::rgb(0xef, 0x44, 0x44),
        width: 4.0,
        opacity: 1.0,
        kind: StrokeKind::Pen,
    })
}

fn painted(pixels: &[u8]) -> usize {
    pixels.chunks_exact(4).filter(|px| px[3] > 0).count()
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    let idx = ((y * SIZE + x) * 4) as usize;
    [pixels[idx], pixels[idx + 1], pixels[idx + 2], pixels[idx + 3]]
}

#[test]
fn scrolling_translates_the_rendered_ink_exactly() {
    let canvas = PageCanvas {
        annotations: vec![pen_stroke(vec![
            PagePoint::new(10.0, 90.0),
            PagePoint::new(50.0, 100.0),
            PagePoint::new(30.0, 110.0),
        ])],
    };

    let at_top = render_canvas_to_rgba(&canvas, None, ScrollOffset::new(0.0, 60.0), surface(), None);
    let scrolled =
        render_canvas_to_rgba(&canvas, None, ScrollOffset::new(0.0, 80.0), surface(), None);

    assert!(painted(&at_top) > 0);
    // Scrolling down by 20 shifts every pixel up by 20 in the overlap.
    for y in 0..SIZE - 20 {
        for x in 0..SIZE {
            assert_eq!(
                pixel(&scrolled, x, y),
                pixel(&at_top, x, y + 20),
                "mismatch at ({x}, {y})"
            );
        }
    }
}

#[test]
fn ink_drawn_while_scrolled_lands_at_the_same_page_position() {
    let mut session = OverlaySession::new();
    assert!(session.attach(surface()));

    session.set_scroll(ScrollOffset::new(0.0, 200.0));
    session.begin_gesture(ViewportPoint::new(20.0, 20.0));
    session.extend_gesture(ViewportPoint::new(40.0, 20.0), Duration::from_millis(20));
    session.end_gesture();

    // Rendered at the capture scroll: visible where it was drawn.
    let frame = session.render_frame(ScrollOffset::new(0.0, 200.0));
    assert_eq!(pixel(&frame, 30, 20)[3], 255);

    // Back at the top of the page the ink is off-screen.
    let frame = session.render_frame(ScrollOffset::new(0.0, 0.0));
    assert_eq!(painted(&frame), 0);
}

#[test]
fn provisional_stroke_is_visible_before_commit() {
    let mut session = OverlaySession::new();
    assert!(session.attach(surface()));

    session.begin_gesture(ViewportPoint::new(10.0, 32.0));
    session.extend_gesture(ViewportPoint::new(50.0, 32.0), Duration::from_millis(20));

    let during = session.render_frame(ScrollOffset::default());
    assert!(painted(&during) > 0);
    assert!(session.canvas().is_empty());

    session.end_gesture();
    let after = session.render_frame(ScrollOffset::default());
    assert!(painted(&after) > 0);
    assert_eq!(session.canvas().len(), 1);
}

#[test]
fn undo_removes_ink_from_the_next_frame() {
    let mut session = OverlaySession::new();
    assert!(session.attach(surface()));

    session.begin_gesture(ViewportPoint::new(10.0, 10.0));
    session.extend_gesture(ViewportPoint::new(50.0, 50.0), Duration::from_millis(20));
    session.end_gesture();
    assert!(painted(&session.render_frame(ScrollOffset::default())) > 0);

    assert!(session.undo());
    assert_eq!(painted(&session.render_frame(ScrollOffset::default())), 0);
}

#[test]
fn eraser_gesture_cuts_through_committed_ink() {
    let mut session = OverlaySession::new();
    assert!(session.attach(surface()));

    session.begin_gesture(ViewportPoint::new(4.0, 32.0));
    session.extend_gesture(ViewportPoint::new(60.0, 32.0), Duration::from_millis(20));
    session.end_gesture();
    let before = painted(&session.render_frame(ScrollOffset::default()));

    session.set_tool(Tool::Eraser);
    session.begin_gesture(ViewportPoint::new(32.0, 4.0));
    session.extend_gesture(ViewportPoint::new(32.0, 60.0), Duration::from_millis(40));
    session.end_gesture();

    let after = session.render_frame(ScrollOffset::default());
    assert!(painted(&after) < before);
    assert_eq!(pixel(&after, 32, 32)[3], 0);
}

#[test]
fn replaying_a_snapshot_renders_identical_bytes() {
    let mut session = OverlaySession::new();
    assert!(session.attach(surface()));

    session.begin_gesture(ViewportPoint::new(6.0, 6.0));
    for i in 1..20 {
        session.extend_gesture(
            ViewportPoint::new(6.0 + i as f32 * 2.5, 6.0 + (i % 4) as f32 * 3.0),
            Duration::from_millis(i as u64 * 20),
        );
    }
    session.end_gesture();

    let bytes = session.serialize_state().expect("serialize");
    let original = session.render_frame(ScrollOffset::default());

    let mut replica = OverlaySession::new();
    assert!(replica.attach(surface()));
    replica.restore_state(&bytes).expect("restore");
    let replayed = replica.render_frame(ScrollOffset::default());

    assert_eq!(original, replayed);
}

#[test]
fn shape_drag_previews_and_commits_rendered_ink() {
    let mut session = OverlaySession::new();
    assert!(session.attach(surface()));
    session.set_tool(Tool::Rectangle);

    session.begin_gesture(ViewportPoint::new(10.0, 10.0));
    session.extend_gesture(ViewportPoint::new(50.0, 40.0), Duration::from_millis(20));
    let during = session.render_frame(ScrollOffset::default());
    assert!(painted(&during) > 0);
    assert!(session.canvas().is_empty());

    session.end_gesture();
    assert_eq!(session.canvas().len(), 1);
    let after = session.render_frame(ScrollOffset::default());
    // Midpoint of the rectangle's top edge; the interior stays clear.
    assert_eq!(pixel(&after, 30, 10)[3], 255);
    assert_eq!(pixel(&after, 30, 25)[3], 0);
}

#[test]
fn highlighter_stroke_blends_at_reduced_uniform_alpha() {
    let mut session = OverlaySession::new();
    assert!(session.attach(surface()));
    session.set_tool(Tool::Highlighter);

    session.begin_gesture(ViewportPoint::new(8.0, 32.0));
    session.extend_gesture(ViewportPoint::new(56.0, 32.0), Duration::from_millis(20));
    session.end_gesture();

    let frame = session.render_frame(ScrollOffset::default());
    let expected_alpha = (0.4f32 * 255.0).round() as u8;
    let alphas: Vec<u8> = frame
        .chunks_exact(4)
        .map(|px| px[3])
        .filter(|a| *a > 0)
        .collect();
    assert!(!alphas.is_empty());
    assert!(alphas.iter().all(|a| *a == expected_alpha));
}
