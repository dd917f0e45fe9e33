use crate::geometry::PagePoint;
use crate::model::{Annotation, Color, Shape, ShapeKind, Stroke, StrokeKind};
use crate::simplify::{simplify_path, DEFAULT_TOLERANCE};
use tracing::debug;

/// Pointer interaction state. Exactly one phase is active at a time and all
/// transitions go through [`GestureTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
    EditingText,
}

/// Transient per-gesture buffer, alive between pointer-down and
/// pointer-up/leave. Holds raw unsimplified samples plus the brush
/// parameters frozen at gesture start.
#[derive(Debug, Clone)]
pub struct DrawingSession {
    pub raw_points: Vec<PagePoint>,
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
    pub kind: StrokeKind,
}

impl DrawingSession {
    /// The in-flight stroke as rendered during the gesture: raw points,
    /// same paint path as committed strokes.
    pub fn provisional_stroke(&self) -> Stroke {
        Stroke {
            points: self.raw_points.clone(),
            color: self.color,
            width: self.width,
            opacity: self.opacity,
            kind: self.kind,
        }
    }
}

/// Transient two-point buffer for drag-to-draw shapes; the end anchor
/// follows the pointer until release.
#[derive(Debug, Clone)]
pub struct ShapeSession {
    pub start: PagePoint,
    pub end: PagePoint,
    pub kind: ShapeKind,
    pub color: Color,
    pub width: f32,
}

impl ShapeSession {
    pub fn provisional_shape(&self) -> Shape {
        Shape {
            start: self.start,
            end: self.end,
            kind: self.kind,
            color: self.color,
            width: self.width,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureEnd {
    Committed(Annotation),
    Discarded,
}

#[derive(Debug)]
pub struct GestureTracker {
    phase: GesturePhase,
    session: Option<DrawingSession>,
    shape: Option<ShapeSession>,
    text_anchor: Option<PagePoint>,
    tolerance: f32,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self {
            phase: GesturePhase::Idle,
            session: None,
            shape: None,
            text_anchor: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == GesturePhase::Idle
    }

    pub fn session(&self) -> Option<&DrawingSession> {
        self.session.as_ref()
    }

    pub fn shape_session(&self) -> Option<&ShapeSession> {
        self.shape.as_ref()
    }

    /// The in-flight annotation, whatever kind of drag is active.
    pub fn live_annotation(&self) -> Option<Annotation> {
        if let Some(session) = &self.session {
            return Some(Annotation::Stroke(session.provisional_stroke()));
        }
        self.shape
            .as_ref()
            .map(|shape| Annotation::Shape(shape.provisional_shape()))
    }

    pub fn text_anchor(&self) -> Option<PagePoint> {
        self.text_anchor
    }

    /// Starts a drag gesture. Refused outside `Idle`.
    pub fn begin_stroke(
        &mut self,
        start: PagePoint,
        color: Color,
        width: f32,
        opacity: f32,
        kind: StrokeKind,
    ) -> bool {
        if self.phase != GesturePhase::Idle {
            debug!(phase = ?self.phase, "ignored stroke start outside idle phase");
            return false;
        }
        self.session = Some(DrawingSession {
            raw_points: vec![start],
            color,
            width,
            opacity,
            kind,
        });
        self.phase = GesturePhase::Dragging;
        true
    }

    /// Starts a drag-to-draw shape gesture. Refused outside `Idle`.
    pub fn begin_shape(&mut self, start: PagePoint, kind: ShapeKind, color: Color, width: f32) -> bool {
        if self.phase != GesturePhase::Idle {
            debug!(phase = ?self.phase, "ignored shape start outside idle phase");
            return false;
        }
        self.shape = Some(ShapeSession {
            start,
            end: start,
            kind,
            color,
            width,
        });
        self.phase = GesturePhase::Dragging;
        true
    }

    /// Starts text entry at an anchor. Refused outside `Idle`.
    pub fn begin_text(&mut self, anchor: PagePoint) -> bool {
        if self.phase != GesturePhase::Idle {
            debug!(phase = ?self.phase, "ignored text start outside idle phase");
            return false;
        }
        self.text_anchor = Some(anchor);
        self.phase = GesturePhase::EditingText;
        true
    }

    /// Appends a sample to the active drag. Freehand gestures skip samples
    /// identical to the last one and keep everything else unthrottled; shape
    /// gestures move the end anchor.
    pub fn extend(&mut self, point: PagePoint) -> bool {
        if let Some(shape) = self.shape.as_mut() {
            if shape.end == point {
                return false;
            }
            shape.end = point;
            return true;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.raw_points.last() == Some(&point) {
            return false;
        }
        session.raw_points.push(point);
        true
    }

    /// Ends the active drag. Freehand gestures are simplified and committed,
    /// or discarded when fewer than two samples were captured; shape gestures
    /// commit unless the pointer never moved. A no-op outside `Dragging`.
    pub fn finish_drag(&mut self) -> GestureEnd {
        if self.phase != GesturePhase::Dragging {
            return GestureEnd::Discarded;
        }
        self.phase = GesturePhase::Idle;
        if let Some(shape) = self.shape.take() {
            if shape.start == shape.end {
                debug!("discarded zero-extent shape gesture");
                return GestureEnd::Discarded;
            }
            return GestureEnd::Committed(Annotation::Shape(shape.provisional_shape()));
        }
        let Some(session) = self.session.take() else {
            return GestureEnd::Discarded;
        };
        if session.raw_points.len() < 2 {
            debug!("discarded gesture with fewer than two samples");
            return GestureEnd::Discarded;
        }
        let points = simplify_path(&session.raw_points, self.tolerance);
        GestureEnd::Committed(Annotation::Stroke(Stroke {
            points,
            color: session.color,
            width: session.width,
            opacity: session.opacity,
            kind: session.kind,
        }))
    }

    /// Leaves text entry, committed or not.
    pub fn finish_text(&mut self) {
        if self.phase == GesturePhase::EditingText {
            self.phase = GesturePhase::Idle;
            self.text_anchor = None;
        }
    }

    /// Drops any in-flight gesture without committing.
    pub fn cancel(&mut self) {
        self.phase = GesturePhase::Idle;
        self.session = None;
        self.shape = None;
        self.text_anchor = None;
    }
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new()
    }
}
