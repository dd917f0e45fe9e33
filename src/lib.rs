//! In-page freehand annotation overlay engine.
//!
//! Captures pointer gestures over a scrollable page, simplifies them with
//! Ramer-Douglas-Peucker, renders them as Catmull-Rom curves anchored to
//! page coordinates, and tracks bounded snapshot undo/redo. The engine is
//! host-agnostic; [`app`] ships a small eframe demo that embeds it.

pub mod app;
pub mod export;
pub mod geometry;
pub mod history;
pub mod input;
pub mod logging;
pub mod model;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod settings_store;
pub mod simplify;
