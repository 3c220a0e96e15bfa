//! Circular avatar masks.
//!
//! Both helpers produce RGBA output that is transparent outside the circle,
//! with anti-aliased edges (see [`circle_coverage`]).

use super::calculations::circle_coverage;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("circle target must be at least 1x1, got {width}x{height}")]
pub struct EmptyTarget {
    pub width: u32,
    pub height: u32,
}

fn apply_mask(mut pixels: RgbaImage, cx: f32, cy: f32, radius: f32) -> RgbaImage {
    for (x, y, px) in pixels.enumerate_pixels_mut() {
        let coverage = circle_coverage(x, y, cx, cy, radius);
        px[3] = (px[3] as f32 * coverage).round() as u8;
    }
    pixels
}

/// Cut a circle of diameter `min(width, height)` out of `image`.
///
/// The circle is taken from the top-left square of the source; the result is
/// that `d x d` square with everything outside the circle transparent. The
/// rest of the source is cropped away rather than kept as a transparent
/// `w x h` canvas.
pub fn circular_bitmap(image: &DynamicImage) -> RgbaImage {
    let diameter = image.width().min(image.height());
    let square = image.crop_imm(0, 0, diameter, diameter).to_rgba8();
    let r = diameter as f32 / 2.0;
    apply_mask(square, r, r, r)
}

/// Scale the whole of `image` to `width x height` and clip it to a circle.
///
/// The circle is centred on the target and its radius is half the shorter
/// side, so non-square targets get transparent bands along the longer axis.
pub fn circular_bitmap_sized(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<RgbaImage, EmptyTarget> {
    if width == 0 || height == 0 {
        return Err(EmptyTarget { width, height });
    }

    let scaled = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgba8();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let radius = width.min(height) as f32 / 2.0;
    Ok(apply_mask(scaled, cx, cy, radius))
}
