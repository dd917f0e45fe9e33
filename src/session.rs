use crate::geometry::{to_page_space, PagePoint, ScrollOffset, ViewportPoint};
use crate::history::SnapshotHistory;
use crate::input::{GestureEnd, GesturePhase, GestureTracker};
use crate::model::{
    Annotation, Color, PageCanvas, ShapeKind, StrokeKind, TextAnnotation, Tool,
    DEFAULT_STROKE_WIDTH, HIGHLIGHTER_OPACITY,
};
use crate::render::{render_canvas_to_rgba, SurfaceSpec};
use crate::scheduler::{MoveThrottle, RepaintScheduler};
use ab_glyph::FontArc;
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MIN_STROKE_WIDTH: f32 = 1.0;
pub const MAX_STROKE_WIDTH: f32 = 50.0;

/// The engine object a host embeds. Owns the gesture tracker, history,
/// schedulers and surface/scroll mirrors; carries no global state, so a host
/// can run several sessions side by side.
pub struct OverlaySession {
    attached: bool,
    surface: SurfaceSpec,
    scroll: ScrollOffset,
    tool: Tool,
    color: Color,
    width: f32,
    tracker: GestureTracker,
    history: SnapshotHistory,
    history_capacity: usize,
    repaint: RepaintScheduler,
    move_throttle: MoveThrottle,
    font: Option<FontArc>,
}

impl OverlaySession {
    pub fn new() -> Self {
        Self {
            attached: false,
            surface: SurfaceSpec::new(1, 1, 1.0),
            scroll: ScrollOffset::default(),
            tool: Tool::Pen,
            color: Color::rgb(0x3b, 0x82, 0xf6),
            width: DEFAULT_STROKE_WIDTH,
            tracker: GestureTracker::new(),
            history: SnapshotHistory::new(),
            history_capacity: crate::history::DEFAULT_HISTORY_CAPACITY,
            repaint: RepaintScheduler::new(),
            move_throttle: MoveThrottle::new(),
            font: None,
        }
    }

    /// Binds the session to a surface and creates a fresh empty store.
    /// Attaching an already-attached session is a logged no-op.
    pub fn attach(&mut self, surface: SurfaceSpec) -> bool {
        if self.attached {
            warn!("attach ignored: session already attached");
            return false;
        }
        self.attached = true;
        self.surface = surface;
        self.scroll = ScrollOffset::default();
        self.tracker = GestureTracker::new();
        self.history = SnapshotHistory::with_capacity(self.history_capacity);
        self.repaint.request();
        info!(width = surface.width, height = surface.height, "overlay attached");
        true
    }

    /// Unbinds the session; an in-flight gesture is dropped uncommitted.
    /// Detaching a detached session is a logged no-op.
    pub fn detach(&mut self) -> bool {
        if !self.attached {
            warn!("detach ignored: session not attached");
            return false;
        }
        self.tracker.cancel();
        self.attached = false;
        info!("overlay detached");
        true
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn phase(&self) -> GesturePhase {
        self.tracker.phase()
    }

    pub fn canvas(&self) -> &PageCanvas {
        self.history.canvas()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn scroll(&self) -> ScrollOffset {
        self.scroll
    }

    pub fn surface(&self) -> SurfaceSpec {
        self.surface
    }

    pub fn text_anchor(&self) -> Option<PagePoint> {
        self.tracker.text_anchor()
    }

    /// Takes effect with the next attach; a live history keeps its bound.
    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.history_capacity = capacity.max(1);
    }

    pub fn set_font(&mut self, font: FontArc) {
        self.font = Some(font);
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Accepts `#rrggbb`; anything else keeps the current color.
    pub fn set_color_hex(&mut self, hex: &str) -> bool {
        match Color::from_hex(hex) {
            Some(color) => {
                self.color = color;
                true
            }
            None => {
                warn!(hex, "ignored invalid color");
                false
            }
        }
    }

    pub fn set_size(&mut self, width: f32) {
        self.width = width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH);
    }

    /// Mirrors the page scroll position. Safe mid-gesture: captured points
    /// already live in page space.
    pub fn set_scroll(&mut self, scroll: ScrollOffset) {
        if self.scroll != scroll {
            self.scroll = scroll;
            self.repaint.request();
        }
    }

    /// Mirrors a viewport resize. Stored annotations are unaffected.
    pub fn resize_surface(&mut self, surface: SurfaceSpec) {
        if self.surface != surface {
            self.surface = surface;
            self.repaint.request();
        }
    }

    /// Pointer-down. For drawing tools this opens a drag gesture; for the
    /// text tool it opens text entry at the anchor.
    pub fn begin_gesture(&mut self, point: ViewportPoint) {
        if !self.attached {
            debug!("gesture ignored: session not attached");
            return;
        }
        let page = to_page_space(point, self.scroll);
        let started = match self.tool {
            Tool::Text => self.tracker.begin_text(page),
            Tool::Pen => {
                self.tracker
                    .begin_stroke(page, self.color, self.width, 1.0, StrokeKind::Pen)
            }
            Tool::Highlighter => self.tracker.begin_stroke(
                page,
                self.color,
                self.width,
                HIGHLIGHTER_OPACITY,
                StrokeKind::Highlighter,
            ),
            Tool::Eraser => {
                self.tracker
                    .begin_stroke(page, self.color, self.width, 1.0, StrokeKind::Eraser)
            }
            Tool::Line => self.begin_shape(page, ShapeKind::Line),
            Tool::Arrow => self.begin_shape(page, ShapeKind::Arrow),
            Tool::Rectangle => self.begin_shape(page, ShapeKind::Rectangle),
            Tool::Ellipse => self.begin_shape(page, ShapeKind::Ellipse),
        };
        if started {
            self.repaint.request();
        }
    }

    /// Pointer-move. Every sample is captured; repaint requests are gated by
    /// the move throttle, with the final sample flushed by [`Self::tick`].
    pub fn extend_gesture(&mut self, point: ViewportPoint, now: Duration) {
        if self.phase() != GesturePhase::Dragging {
            return;
        }
        let page = to_page_space(point, self.scroll);
        if self.tracker.extend(page) && self.move_throttle.admit(now) {
            self.repaint.request();
        }
    }

    fn begin_shape(&mut self, page: PagePoint, kind: ShapeKind) -> bool {
        self.tracker.begin_shape(page, kind, self.color, self.width)
    }

    /// Pointer-up: commits the gesture (simplified for freehand strokes), or
    /// discards degenerate ones.
    pub fn end_gesture(&mut self) {
        match self.tracker.finish_drag() {
            GestureEnd::Committed(annotation) => {
                debug!("gesture committed");
                self.history.append(annotation);
                self.repaint.request();
            }
            GestureEnd::Discarded => {
                self.repaint.request();
            }
        }
    }

    /// Pointer leaving the surface commits like pointer-up; ink the user has
    /// already seen is never thrown away.
    pub fn pointer_left(&mut self) {
        self.end_gesture();
    }

    /// Appends a text annotation. Empty text is a logged no-op; either way
    /// an open text-entry phase is closed.
    pub fn commit_text(&mut self, anchor: PagePoint, text: &str, color: Color, font_size: f32) -> bool {
        if self.phase() == GesturePhase::Dragging {
            debug!("commit_text ignored during drag gesture");
            return false;
        }
        self.tracker.finish_text();
        if text.is_empty() {
            debug!("empty text annotation dropped");
            return false;
        }
        self.history.append(Annotation::Text(TextAnnotation {
            anchor,
            text: text.to_string(),
            color,
            font_size,
        }));
        self.repaint.request();
        true
    }

    /// Abandons an open text-entry phase without committing.
    pub fn cancel_text(&mut self) {
        self.tracker.finish_text();
    }

    pub fn undo(&mut self) -> bool {
        if !self.history_mutation_allowed("undo") {
            return false;
        }
        let applied = self.history.undo();
        if applied {
            self.repaint.request();
        }
        applied
    }

    pub fn redo(&mut self) -> bool {
        if !self.history_mutation_allowed("redo") {
            return false;
        }
        let applied = self.history.redo();
        if applied {
            self.repaint.request();
        }
        applied
    }

    pub fn clear(&mut self) -> bool {
        if !self.history_mutation_allowed("clear") {
            return false;
        }
        self.history.clear();
        self.repaint.request();
        true
    }

    fn history_mutation_allowed(&self, operation: &str) -> bool {
        if !self.attached {
            debug!(operation, "history operation ignored: not attached");
            return false;
        }
        if self.phase() == GesturePhase::Dragging {
            debug!(operation, "history operation ignored during drag gesture");
            return false;
        }
        true
    }

    /// Full repaint at the given scroll offset: committed annotations oldest
    /// first, then the provisional stroke on top.
    pub fn render_frame(&mut self, scroll: ScrollOffset) -> Vec<u8> {
        self.scroll = scroll;
        let live = self.tracker.live_annotation();
        render_canvas_to_rgba(
            self.history.canvas(),
            live.as_ref(),
            scroll,
            self.surface,
            self.font.as_ref(),
        )
    }

    /// Opaque JSON snapshot of the committed annotation sequence.
    pub fn serialize_state(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self.history.canvas()).context("serialize annotation state")
    }

    /// Restores a snapshot produced by [`Self::serialize_state`], undoably.
    /// Like the other history mutations, refused while detached or mid-drag.
    pub fn restore_state(&mut self, bytes: &[u8]) -> Result<()> {
        let canvas: PageCanvas =
            serde_json::from_slice(bytes).context("deserialize annotation state")?;
        if !self.history_mutation_allowed("restore") {
            bail!("annotation state restore refused");
        }
        self.history.replace(canvas);
        self.repaint.request();
        Ok(())
    }

    /// Frame pump: flushes a deferred move sample and reports whether a
    /// coalesced repaint is due at `now`.
    pub fn tick(&mut self, now: Duration) -> bool {
        if self.move_throttle.take_deferred() {
            self.repaint.request();
        }
        self.repaint.take_due(now)
    }

    pub fn repaint_pending(&self) -> bool {
        self.repaint.is_pending()
    }
}

impl Default for OverlaySession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::OverlaySession;
    use crate::geometry::{PagePoint, ScrollOffset, ViewportPoint};
    use crate::input::GesturePhase;
    use crate::model::{Annotation, Color, ShapeKind, Tool};
    use crate::render::SurfaceSpec;
    use std::time::Duration;

    fn attached_session() -> OverlaySession {
        let mut session = OverlaySession::new();
        assert!(session.attach(SurfaceSpec::new(64, 64, 1.0)));
        session
    }

    fn drag(session: &mut OverlaySession, from: (f32, f32), to: (f32, f32)) {
        session.begin_gesture(ViewportPoint::new(from.0, from.1));
        session.extend_gesture(ViewportPoint::new(to.0, to.1), Duration::from_millis(100));
        session.end_gesture();
    }

    #[test]
    fn attach_and_detach_are_idempotent() {
        let mut session = OverlaySession::new();
        assert!(session.attach(SurfaceSpec::new(64, 64, 1.0)));
        assert!(!session.attach(SurfaceSpec::new(64, 64, 1.0)));
        assert!(session.detach());
        assert!(!session.detach());
    }

    #[test]
    fn gestures_are_ignored_while_detached() {
        let mut session = OverlaySession::new();
        session.begin_gesture(ViewportPoint::new(5.0, 5.0));
        assert_eq!(session.phase(), GesturePhase::Idle);
        session.end_gesture();
        assert!(session.canvas().is_empty());
    }

    #[test]
    fn committed_stroke_lands_in_the_store() {
        let mut session = attached_session();
        drag(&mut session, (5.0, 5.0), (30.0, 30.0));
        assert_eq!(session.canvas().len(), 1);
        assert_eq!(session.phase(), GesturePhase::Idle);
    }

    #[test]
    fn points_are_captured_in_page_space() {
        let mut session = attached_session();
        session.set_scroll(ScrollOffset::new(0.0, 200.0));
        drag(&mut session, (10.0, 10.0), (20.0, 20.0));

        let stroke = match &session.canvas().annotations[0] {
            crate::model::Annotation::Stroke(s) => s,
            other => panic!("unexpected annotation {other:?}"),
        };
        assert_eq!(stroke.points[0], PagePoint::new(10.0, 210.0));
        assert_eq!(stroke.points[1], PagePoint::new(20.0, 220.0));
    }

    #[test]
    fn undo_and_clear_are_inert_during_a_drag() {
        let mut session = attached_session();
        drag(&mut session, (1.0, 1.0), (10.0, 10.0));

        session.begin_gesture(ViewportPoint::new(20.0, 20.0));
        assert!(!session.undo());
        assert!(!session.redo());
        assert!(!session.clear());
        assert_eq!(session.canvas().len(), 1);
        session.end_gesture();

        assert!(session.undo());
        assert!(session.canvas().is_empty());
    }

    #[test]
    fn empty_text_is_dropped_and_closes_text_entry() {
        let mut session = attached_session();
        session.set_tool(Tool::Text);
        session.begin_gesture(ViewportPoint::new(8.0, 8.0));
        assert_eq!(session.phase(), GesturePhase::EditingText);

        let anchor = session.text_anchor().expect("anchor set");
        assert!(!session.commit_text(anchor, "", Color::rgb(0, 0, 0), 16.0));
        assert_eq!(session.phase(), GesturePhase::Idle);
        assert!(session.canvas().is_empty());
    }

    #[test]
    fn text_commit_appends_an_annotation() {
        let mut session = attached_session();
        session.set_tool(Tool::Text);
        session.begin_gesture(ViewportPoint::new(8.0, 8.0));
        let anchor = session.text_anchor().expect("anchor set");
        assert!(session.commit_text(anchor, "note", Color::rgb(1, 2, 3), 16.0));
        assert_eq!(session.canvas().len(), 1);
    }

    #[test]
    fn invalid_hex_color_keeps_the_current_color() {
        let mut session = attached_session();
        let before = session.color();
        assert!(!session.set_color_hex("#xyzxyz"));
        assert_eq!(session.color(), before);
        assert!(session.set_color_hex("#ef4444"));
        assert_eq!(session.color(), Color::rgb(0xef, 0x44, 0x44));
    }

    #[test]
    fn size_is_clamped_to_the_valid_range() {
        let mut session = attached_session();
        session.set_size(0.0);
        assert_eq!(session.width(), super::MIN_STROKE_WIDTH);
        session.set_size(500.0);
        assert_eq!(session.width(), super::MAX_STROKE_WIDTH);
    }

    #[test]
    fn serialize_and_restore_roundtrip_the_store() {
        let mut session = attached_session();
        drag(&mut session, (5.0, 5.0), (30.0, 12.0));
        let anchor = PagePoint::new(40.0, 40.0);
        session.commit_text(anchor, "hello", Color::rgb(9, 9, 9), 20.0);

        let bytes = session.serialize_state().expect("serialize");
        let before = session.canvas().clone();

        assert!(session.clear());
        assert!(session.canvas().is_empty());

        session.restore_state(&bytes).expect("restore");
        assert_eq!(session.canvas(), &before);

        // Restore is undoable like any forward mutation.
        assert!(session.undo());
        assert!(session.canvas().is_empty());
    }

    #[test]
    fn shape_drag_commits_page_space_anchors() {
        let mut session = attached_session();
        session.set_tool(Tool::Rectangle);
        session.set_scroll(ScrollOffset::new(0.0, 100.0));
        drag(&mut session, (10.0, 10.0), (40.0, 30.0));

        let shape = match &session.canvas().annotations[0] {
            Annotation::Shape(shape) => shape,
            other => panic!("unexpected annotation {other:?}"),
        };
        assert_eq!(shape.kind, ShapeKind::Rectangle);
        assert_eq!(shape.start, PagePoint::new(10.0, 110.0));
        assert_eq!(shape.end, PagePoint::new(40.0, 130.0));
    }

    #[test]
    fn shape_click_without_movement_is_discarded() {
        let mut session = attached_session();
        session.set_tool(Tool::Arrow);
        session.begin_gesture(ViewportPoint::new(20.0, 20.0));
        session.end_gesture();
        assert!(session.canvas().is_empty());
        assert_eq!(session.phase(), GesturePhase::Idle);
    }

    #[test]
    fn restore_is_refused_during_a_drag() {
        let mut session = attached_session();
        drag(&mut session, (5.0, 5.0), (30.0, 30.0));
        let bytes = session.serialize_state().expect("serialize");

        session.begin_gesture(ViewportPoint::new(40.0, 40.0));
        session.extend_gesture(ViewportPoint::new(50.0, 50.0), Duration::from_millis(200));
        assert!(session.restore_state(&bytes).is_err());
        assert_eq!(session.canvas().len(), 1);

        session.end_gesture();
        assert_eq!(session.canvas().len(), 2);
        assert!(session.restore_state(&bytes).is_ok());
        assert_eq!(session.canvas().len(), 1);
    }

    #[test]
    fn restore_rejects_malformed_bytes() {
        let mut session = attached_session();
        assert!(session.restore_state(b"not json").is_err());
    }

    #[test]
    fn tick_flushes_deferred_move_samples() {
        let mut session = attached_session();
        session.begin_gesture(ViewportPoint::new(0.0, 0.0));
        // Drain the pending attach/begin repaint first.
        assert!(session.tick(Duration::from_millis(0)));

        session.extend_gesture(ViewportPoint::new(1.0, 1.0), Duration::from_millis(1));
        session.extend_gesture(ViewportPoint::new(2.0, 2.0), Duration::from_millis(2));
        // Second sample was throttled; the pump surfaces it as a repaint.
        assert!(session.tick(Duration::from_millis(100)));
        session.end_gesture();
    }

    #[test]
    fn detach_drops_an_in_flight_gesture() {
        let mut session = attached_session();
        session.begin_gesture(ViewportPoint::new(0.0, 0.0));
        session.extend_gesture(ViewportPoint::new(9.0, 9.0), Duration::from_millis(1));
        assert!(session.detach());
        assert_eq!(session.phase(), GesturePhase::Idle);
        assert!(session.canvas().is_empty());
    }
}
