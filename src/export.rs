use crate::geometry::ScrollOffset;
use crate::model::{Color, PageCanvas};
use crate::render::{render_canvas_to_rgba, SurfaceSpec};
use ab_glyph::FontArc;
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

pub const EXPORT_SUBDIR: &str = "draw_exports";

/// Renders the annotation layer alone, transparent background.
pub fn annotation_image(
    canvas: &PageCanvas,
    scroll: ScrollOffset,
    surface: SurfaceSpec,
    font: Option<&FontArc>,
) -> Result<RgbaImage> {
    let pixels = render_canvas_to_rgba(canvas, None, scroll, surface, font);
    RgbaImage::from_raw(surface.width, surface.height, pixels)
        .ok_or_else(|| anyhow!("annotation buffer does not match surface dimensions"))
}

/// Annotation layer composited over a captured page background.
pub fn composite_over_background(
    background: &RgbaImage,
    annotation: &RgbaImage,
) -> Result<RgbaImage> {
    if background.dimensions() != annotation.dimensions() {
        return Err(anyhow!(
            "background {:?} and annotation {:?} dimensions differ",
            background.dimensions(),
            annotation.dimensions()
        ));
    }
    let mut output = background.clone();
    blend_in_place(&mut output, annotation);
    Ok(output)
}

/// Annotation layer composited over a solid color.
pub fn composite_over_blank(annotation: &RgbaImage, background: Color) -> RgbaImage {
    let (width, height) = annotation.dimensions();
    let mut output = RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([background.r, background.g, background.b, 255]),
    );
    blend_in_place(&mut output, annotation);
    output
}

fn blend_in_place(base: &mut RgbaImage, top: &RgbaImage) {
    for (dst, src) in base.pixels_mut().zip(top.pixels()) {
        dst.0 = blend_pixel(dst.0, src.0);
    }
}

fn blend_pixel(bottom: [u8; 4], top: [u8; 4]) -> [u8; 4] {
    let sa = top[3] as f32 / 255.0;
    let da = bottom[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return [0, 0, 0, 0];
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    [
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

pub fn exe_relative_output_folder_from_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(EXPORT_SUBDIR))
}

pub fn ensure_output_folder() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    let output = exe_relative_output_folder_from_path(&exe_path)?;
    fs::create_dir_all(&output)
        .with_context(|| format!("create export folder {}", output.display()))?;
    Ok(output)
}

pub fn timestamped_stem(now: chrono::DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn build_filename(stem: &str, suffix: &str) -> String {
    format!("{}_{}.png", stem, suffix)
}

pub fn save_png(path: &Path, image: &RgbaImage) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("write png {}", path.display()))
}

/// Renders the visible canvas and saves it under the export folder,
/// composited over `background` when one is supplied and over the blank
/// color otherwise. Returns the written path.
pub fn export_canvas(
    canvas: &PageCanvas,
    scroll: ScrollOffset,
    surface: SurfaceSpec,
    font: Option<&FontArc>,
    background: Option<&RgbaImage>,
    blank_color: Color,
) -> Result<PathBuf> {
    let annotation = annotation_image(canvas, scroll, surface, font)?;
    let (composed, suffix) = match background {
        Some(bg) => (composite_over_background(bg, &annotation)?, "page"),
        None => (composite_over_blank(&annotation, blank_color), "blank"),
    };

    let folder = ensure_output_folder()?;
    let path = folder.join(build_filename(&timestamped_stem(Local::now()), suffix));
    save_png(&path, &composed)?;
    Ok(path)
}
