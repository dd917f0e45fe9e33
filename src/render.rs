use crate::geometry::{to_viewport_space, ScrollOffset};
use crate::model::{
    Annotation, Color, PageCanvas, Shape, ShapeKind, Stroke, StrokeKind, TextAnnotation,
};
use ab_glyph::{point, Font, FontArc, Glyph, PxScale, ScaleFont};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Catmull-Rom tension: control points sit at 1/10 of the neighbor delta.
const CURVE_TENSION: f32 = 1.0 / 10.0;
/// Upper bound on flattening steps per cubic segment.
const MAX_CURVE_STEPS: usize = 512;
/// Arrow heads scale with the stroke width but never shrink below this.
const MIN_ARROW_HEAD: f32 = 15.0;

/// Raster target description: device-pixel dimensions plus the ratio used to
/// map viewport units onto device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSpec {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl SurfaceSpec {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: sanitize_ratio(pixel_ratio),
        }
    }

    pub fn from_viewport(width: f32, height: f32, pixel_ratio: f32) -> Self {
        let ratio = sanitize_ratio(pixel_ratio);
        Self {
            width: (width * ratio).round().max(1.0) as u32,
            height: (height * ratio).round().max(1.0) as u32,
            pixel_ratio: ratio,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

fn sanitize_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

/// Full redraw of the annotation sequence, oldest first, then the in-flight
/// annotation on top. The buffer starts fully transparent; compositing
/// happens against whatever the host blits it over.
pub fn render_canvas_to_rgba(
    canvas: &PageCanvas,
    live: Option<&Annotation>,
    scroll: ScrollOffset,
    surface: SurfaceSpec,
    font: Option<&FontArc>,
) -> Vec<u8> {
    let mut pixels = vec![0u8; surface.byte_len()];
    for annotation in &canvas.annotations {
        paint_annotation(&mut pixels, surface, scroll, annotation, font);
    }
    if let Some(annotation) = live {
        paint_annotation(&mut pixels, surface, scroll, annotation, font);
    }
    pixels
}

fn paint_annotation(
    pixels: &mut [u8],
    surface: SurfaceSpec,
    scroll: ScrollOffset,
    annotation: &Annotation,
    font: Option<&FontArc>,
) {
    match annotation {
        Annotation::Stroke(stroke) => paint_stroke(pixels, surface, scroll, stroke),
        Annotation::Shape(shape) => paint_shape(pixels, surface, scroll, shape),
        Annotation::Text(text) => paint_text(pixels, surface, scroll, text, font),
    }
}

/// Rasterizes one stroke. Coverage is accumulated per stroke and blended
/// onto the surface in a single pass, so overlapping stamps inside the same
/// stroke never double-darken; erasers clear alpha over the covered area.
pub fn paint_stroke(pixels: &mut [u8], surface: SurfaceSpec, scroll: ScrollOffset, stroke: &Stroke) {
    if stroke.points.len() < 2 {
        return;
    }

    let ratio = surface.pixel_ratio;
    let device: Vec<(f32, f32)> = stroke
        .points
        .iter()
        .map(|p| {
            let vp = to_viewport_space(*p, scroll);
            (vp.x * ratio, vp.y * ratio)
        })
        .collect();

    let radius = ((stroke.effective_width() * ratio) / 2.0).round().max(1.0) as u32;
    let rows = brush_rows(radius);
    let spacing = (radius as f32 * 0.5).max(0.5);

    let mut mask = CoverageMask::new(surface.width, surface.height);
    if device.len() == 2 {
        stamp_segment(&mut mask, device[0], device[1], &rows, spacing);
    } else {
        for segment in catmull_rom_segments(&device) {
            let samples = flatten_cubic(&segment, spacing);
            for pair in samples.windows(2) {
                stamp_segment(&mut mask, pair[0], pair[1], &rows, spacing);
            }
        }
    }

    match stroke.kind {
        StrokeKind::Eraser => mask.erase_into(pixels),
        StrokeKind::Pen | StrokeKind::Highlighter => {
            mask.blend_into(pixels, stroke.color, stroke.opacity)
        }
    }
}

/// Rasterizes one two-point shape with the round brush. Shapes share the
/// per-annotation coverage mask, so outlines that cross themselves (a thin
/// rectangle, a squashed ellipse) still resolve in a single blend pass.
pub fn paint_shape(pixels: &mut [u8], surface: SurfaceSpec, scroll: ScrollOffset, shape: &Shape) {
    let ratio = surface.pixel_ratio;
    let device = |p| {
        let vp = to_viewport_space(p, scroll);
        (vp.x * ratio, vp.y * ratio)
    };
    let a = device(shape.start);
    let b = device(shape.end);

    let radius = ((shape.width * ratio) / 2.0).round().max(1.0) as u32;
    let rows = brush_rows(radius);
    let spacing = (radius as f32 * 0.5).max(0.5);
    let mut mask = CoverageMask::new(surface.width, surface.height);

    match shape.kind {
        ShapeKind::Line => stamp_segment(&mut mask, a, b, &rows, spacing),
        ShapeKind::Arrow => {
            stamp_segment(&mut mask, a, b, &rows, spacing);
            let head_len = (shape.width * 4.0).max(MIN_ARROW_HEAD) * ratio;
            stamp_arrow_head(&mut mask, a, b, head_len);
        }
        ShapeKind::Rectangle => {
            let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
            let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
            let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
            for i in 0..4 {
                stamp_segment(&mut mask, corners[i], corners[(i + 1) % 4], &rows, spacing);
            }
        }
        ShapeKind::Ellipse => {
            let cx = (a.0 + b.0) / 2.0;
            let cy = (a.1 + b.1) / 2.0;
            let rx = (b.0 - a.0).abs() / 2.0;
            let ry = (b.1 - a.1).abs() / 2.0;
            let circumference = std::f32::consts::TAU * rx.max(ry).max(1.0);
            let steps = ((circumference / spacing).ceil() as usize).clamp(8, 4 * MAX_CURVE_STEPS);
            let at = |i: usize| {
                let t = i as f32 / steps as f32 * std::f32::consts::TAU;
                (cx + rx * t.cos(), cy + ry * t.sin())
            };
            for i in 0..steps {
                stamp_segment(&mut mask, at(i), at(i + 1), &rows, spacing);
            }
        }
    }

    mask.blend_into(pixels, shape.color, 1.0);
}

/// Filled triangular head centered on the end anchor, pointing along the
/// shaft. Side length is the head length, matching the shaft-width scaling.
fn stamp_arrow_head(mask: &mut CoverageMask, a: (f32, f32), b: (f32, f32), head_len: f32) {
    let len = dist(a, b);
    if len <= f32::EPSILON {
        return;
    }
    let ux = (b.0 - a.0) / len;
    let uy = (b.1 - a.1) / len;
    let half = head_len / 2.0;
    let tip = (b.0 + ux * half, b.1 + uy * half);
    let base = (b.0 - ux * half, b.1 - uy * half);
    let left = (base.0 - uy * half, base.1 + ux * half);
    let right = (base.0 + uy * half, base.1 - ux * half);
    fill_triangle(mask, tip, left, right);
}

/// Fills a triangle into the mask: half-plane tests over the clipped
/// bounding box, accepting either winding.
fn fill_triangle(mask: &mut CoverageMask, a: (f32, f32), b: (f32, f32), c: (f32, f32)) {
    let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as i32;
    let max_x = a.0.max(b.0).max(c.0).ceil().min(mask.width as f32 - 1.0) as i32;
    let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as i32;
    let max_y = a.1.max(b.1).max(c.1).ceil().min(mask.height as f32 - 1.0) as i32;

    let edge = |p: (f32, f32), q: (f32, f32), x: f32, y: f32| {
        (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
    };
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
            let e0 = edge(a, b, fx, fy);
            let e1 = edge(b, c, fx, fy);
            let e2 = edge(c, a, fx, fy);
            if (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0) {
                mask.data[y as usize * mask.width as usize + x as usize] = 255;
            }
        }
    }
}

/// One cubic per consecutive point pair; boundary neighbors are clamped to
/// the endpoints. Every segment starts and ends exactly on input points.
pub fn catmull_rom_segments(points: &[(f32, f32)]) -> Vec<[(f32, f32); 4]> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    let mut segments = Vec::with_capacity(n - 1);
    for i in 0..n - 1 {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(n - 1)];
        let c1 = (
            p1.0 + (p2.0 - p0.0) * CURVE_TENSION,
            p1.1 + (p2.1 - p0.1) * CURVE_TENSION,
        );
        let c2 = (
            p2.0 - (p3.0 - p1.0) * CURVE_TENSION,
            p2.1 - (p3.1 - p1.1) * CURVE_TENSION,
        );
        segments.push([p1, c1, c2, p2]);
    }
    segments
}

pub fn cubic_point(segment: &[(f32, f32); 4], t: f32) -> (f32, f32) {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    (
        b0 * segment[0].0 + b1 * segment[1].0 + b2 * segment[2].0 + b3 * segment[3].0,
        b0 * segment[0].1 + b1 * segment[1].1 + b2 * segment[2].1 + b3 * segment[3].1,
    )
}

/// Samples a cubic into a polyline. Step count adapts to the control polygon
/// length so flat segments stay cheap and long curves stay smooth.
fn flatten_cubic(segment: &[(f32, f32); 4], spacing: f32) -> Vec<(f32, f32)> {
    let polygon_len = dist(segment[0], segment[1])
        + dist(segment[1], segment[2])
        + dist(segment[2], segment[3]);
    let steps = ((polygon_len / spacing).ceil() as usize).clamp(1, MAX_CURVE_STEPS);
    (0..=steps)
        .map(|i| cubic_point(segment, i as f32 / steps as f32))
        .collect()
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

/// Binary per-stroke coverage, stamped with the circular brush and resolved
/// onto the surface in one blend or erase pass.
struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CoverageMask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }

    fn stamp(&mut self, cx: i32, cy: i32, rows: &[BrushRow]) {
        for row in rows {
            let y = cy + row.dy;
            if y < 0 || y >= self.height as i32 {
                continue;
            }
            let x0 = (cx + row.min_dx).max(0);
            let x1 = (cx + row.max_dx).min(self.width as i32 - 1);
            if x0 > x1 {
                continue;
            }
            let base = y as usize * self.width as usize;
            self.data[base + x0 as usize..=base + x1 as usize].fill(255);
        }
    }

    fn blend_into(&self, pixels: &mut [u8], color: Color, opacity: f32) {
        let alpha = opacity.clamp(0.0, 1.0);
        for (i, coverage) in self.data.iter().enumerate() {
            if *coverage == 0 {
                continue;
            }
            blend_pixel_slice(&mut pixels[i * 4..i * 4 + 4], color, alpha);
        }
    }

    fn erase_into(&self, pixels: &mut [u8]) {
        for (i, coverage) in self.data.iter().enumerate() {
            if *coverage == 0 {
                continue;
            }
            pixels[i * 4..i * 4 + 4].fill(0);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BrushRow {
    dy: i32,
    min_dx: i32,
    max_dx: i32,
}

/// Horizontal spans of a filled circle of the given radius, cached per
/// radius since bursts of strokes reuse the same brush size.
fn brush_rows(radius: u32) -> Vec<BrushRow> {
    static CACHE: OnceLock<Mutex<HashMap<u32, Vec<BrushRow>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(mut map) = cache.lock() {
        return map
            .entry(radius)
            .or_insert_with(|| compute_brush_rows(radius))
            .clone();
    }
    compute_brush_rows(radius)
}

fn compute_brush_rows(radius: u32) -> Vec<BrushRow> {
    let r = radius as i32;
    let r_sq = r * r;
    (-r..=r)
        .map(|dy| {
            let half = ((r_sq - dy * dy) as f32).sqrt().floor() as i32;
            BrushRow {
                dy,
                min_dx: -half,
                max_dx: half,
            }
        })
        .collect()
}

/// Stamps the brush along a straight segment, endpoints included.
fn stamp_segment(
    mask: &mut CoverageMask,
    a: (f32, f32),
    b: (f32, f32),
    rows: &[BrushRow],
    spacing: f32,
) {
    let length = dist(a, b);
    let count = (length / spacing).ceil().max(1.0) as usize;
    for i in 0..=count {
        let t = i as f32 / count as f32;
        let x = a.0 + (b.0 - a.0) * t;
        let y = a.1 + (b.1 - a.1) * t;
        mask.stamp(x.round() as i32, y.round() as i32, rows);
    }
}

/// Straight-alpha src-over into one RGBA pixel.
fn blend_pixel_slice(dst: &mut [u8], color: Color, alpha: f32) {
    let sa = alpha;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= f32::EPSILON {
        dst.fill(0);
        return;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    dst[0] = blend(color.r, dst[0]);
    dst[1] = blend(color.g, dst[1]);
    dst[2] = blend(color.b, dst[2]);
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Single-line text at the anchor, no wrapping, no background. Glyph
/// coverage is blended with the annotation color; without a font the
/// annotation is skipped.
fn paint_text(
    pixels: &mut [u8],
    surface: SurfaceSpec,
    scroll: ScrollOffset,
    text: &TextAnnotation,
    font: Option<&FontArc>,
) {
    let Some(font) = font else {
        debug!("text annotation skipped: no font configured");
        return;
    };

    let ratio = surface.pixel_ratio;
    let anchor = to_viewport_space(text.anchor, scroll);
    let scale = PxScale::from(text.font_size * ratio);
    let scaled = font.as_scaled(scale);

    let mut caret_x = anchor.x * ratio;
    let baseline = anchor.y * ratio + scaled.ascent();
    let mut previous = None;

    for ch in text.text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret_x += scaled.kern(prev, id);
        }
        let glyph: Glyph = id.with_scale_and_position(scale, point(caret_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i32 + gx as i32;
                let y = bounds.min.y as i32 + gy as i32;
                if x < 0 || y < 0 || x >= surface.width as i32 || y >= surface.height as i32 {
                    return;
                }
                if coverage <= 0.0 {
                    return;
                }
                let idx = (y as usize * surface.width as usize + x as usize) * 4;
                blend_pixel_slice(&mut pixels[idx..idx + 4], text.color, coverage.min(1.0));
            });
        }
        caret_x += scaled.h_advance(id);
        previous = Some(id);
    }
}
