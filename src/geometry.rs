use serde::{Deserialize, Serialize};

/// A point in page space: viewport coordinates plus the scroll offset at the
/// time of capture. Annotations are stored in this system so they stay glued
/// to page content while the page scrolls underneath the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// A point relative to the visible viewport, as delivered by pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportPoint {
    pub x: f32,
    pub y: f32,
}

impl ViewportPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Current scroll position of the page under the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub x: f32,
    pub y: f32,
}

impl ScrollOffset {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

pub fn to_page_space(point: ViewportPoint, scroll: ScrollOffset) -> PagePoint {
    PagePoint::new(point.x + scroll.x, point.y + scroll.y)
}

pub fn to_viewport_space(point: PagePoint, scroll: ScrollOffset) -> ViewportPoint {
    ViewportPoint::new(point.x - scroll.x, point.y - scroll.y)
}
