use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::model::{Color, Tool, DEFAULT_STROKE_WIDTH};
use serde::{Deserialize, Serialize};

/// Persisted overlay preferences. Every field has a serde default so old
/// settings files keep loading as fields are added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySettings {
    #[serde(default = "default_tool")]
    pub last_tool: Tool,
    #[serde(default = "default_color")]
    pub last_color: Color,
    #[serde(default = "default_size")]
    pub last_size: f32,
    #[serde(default = "default_palette")]
    pub palette: Vec<Color>,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_export_background")]
    pub export_background: Color,
    #[serde(default)]
    pub keybindings: Keybindings,
    #[serde(default)]
    pub debug_logging: bool,
}

/// Single-key shortcut map, one printable key per action. Persisted so a
/// rebound key survives restarts; unknown or empty entries simply never fire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Keybindings {
    #[serde(default = "bind_pen")]
    pub pen: String,
    #[serde(default = "bind_highlighter")]
    pub highlighter: String,
    #[serde(default = "bind_eraser")]
    pub eraser: String,
    #[serde(default = "bind_text")]
    pub text: String,
    #[serde(default = "bind_line")]
    pub line: String,
    #[serde(default = "bind_arrow")]
    pub arrow: String,
    #[serde(default = "bind_rectangle")]
    pub rectangle: String,
    #[serde(default = "bind_circle")]
    pub circle: String,
    #[serde(default = "bind_undo")]
    pub undo: String,
    #[serde(default = "bind_redo")]
    pub redo: String,
    #[serde(default = "bind_export")]
    pub export: String,
    #[serde(default = "bind_clear")]
    pub clear: String,
}

fn bind_pen() -> String {
    "2".into()
}

fn bind_highlighter() -> String {
    "3".into()
}

fn bind_eraser() -> String {
    "4".into()
}

fn bind_text() -> String {
    "5".into()
}

fn bind_line() -> String {
    "l".into()
}

fn bind_arrow() -> String {
    "a".into()
}

fn bind_rectangle() -> String {
    "r".into()
}

fn bind_circle() -> String {
    "c".into()
}

fn bind_undo() -> String {
    "z".into()
}

fn bind_redo() -> String {
    "y".into()
}

fn bind_export() -> String {
    "s".into()
}

fn bind_clear() -> String {
    "d".into()
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            pen: bind_pen(),
            highlighter: bind_highlighter(),
            eraser: bind_eraser(),
            text: bind_text(),
            line: bind_line(),
            arrow: bind_arrow(),
            rectangle: bind_rectangle(),
            circle: bind_circle(),
            undo: bind_undo(),
            redo: bind_redo(),
            export: bind_export(),
            clear: bind_clear(),
        }
    }
}

fn default_tool() -> Tool {
    Tool::Pen
}

fn default_color() -> Color {
    Color::rgb(0x3b, 0x82, 0xf6)
}

fn default_size() -> f32 {
    DEFAULT_STROKE_WIDTH
}

fn default_palette() -> Vec<Color> {
    vec![
        Color::rgb(0xef, 0x44, 0x44),
        Color::rgb(0x22, 0xc5, 0x5e),
        Color::rgb(0x3b, 0x82, 0xf6),
        Color::rgb(0xf5, 0x9e, 0x0b),
    ]
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_export_background() -> Color {
    Color::rgb(255, 255, 255)
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            last_tool: default_tool(),
            last_color: default_color(),
            last_size: default_size(),
            palette: default_palette(),
            history_capacity: default_history_capacity(),
            export_background: default_export_background(),
            keybindings: Keybindings::default(),
            debug_logging: false,
        }
    }
}
