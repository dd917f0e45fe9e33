use crate::geometry::PagePoint;
use serde::{Deserialize, Serialize};

/// Default brush size in page pixels.
pub const DEFAULT_STROKE_WIDTH: f32 = 4.0;
/// Highlighter strokes blend at reduced opacity so page content stays legible.
pub const HIGHLIGHTER_OPACITY: f32 = 0.4;
/// Eraser strokes paint wider than the selected size.
pub const ERASER_WIDTH_MULTIPLIER: f32 = 3.0;
/// Highlighter strokes paint wider than the selected size.
pub const HIGHLIGHTER_WIDTH_MULTIPLIER: f32 = 4.0;
/// Text annotations render at a multiple of the selected brush size.
pub const TEXT_SIZE_MULTIPLIER: f32 = 4.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Pen,
    Highlighter,
    Eraser,
    Text,
    Line,
    Arrow,
    Rectangle,
    Ellipse,
}

/// Stored per stroke so the renderer derives effective width and compositing
/// from the record itself rather than from toolbar state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrokeKind {
    Pen,
    Highlighter,
    Eraser,
}

impl StrokeKind {
    pub fn width_multiplier(self) -> f32 {
        match self {
            StrokeKind::Pen => 1.0,
            StrokeKind::Highlighter => HIGHLIGHTER_WIDTH_MULTIPLIER,
            StrokeKind::Eraser => ERASER_WIDTH_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`. Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A committed freehand stroke. `points` holds the simplified path (at least
/// two entries); the provisional in-flight stroke reuses this type with the
/// raw buffer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stroke {
    pub points: Vec<PagePoint>,
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
    pub kind: StrokeKind,
}

impl Stroke {
    pub fn effective_width(&self) -> f32 {
        self.width * self.kind.width_multiplier()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Line,
    Arrow,
    Rectangle,
    Ellipse,
}

/// A drag-to-draw shape, stored as its two anchor points. Rectangles span
/// the bounding box of the anchors; ellipses are inscribed in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shape {
    pub start: PagePoint,
    pub end: PagePoint,
    pub kind: ShapeKind,
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextAnnotation {
    pub anchor: PagePoint,
    pub text: String,
    pub color: Color,
    pub font_size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    Stroke(Stroke),
    Shape(Shape),
    Text(TextAnnotation),
}

/// The ordered annotation sequence. Later entries paint over earlier ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageCanvas {
    pub annotations: Vec<Annotation>,
}

impl PageCanvas {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }
}
