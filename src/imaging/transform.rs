//! Resize-with-rotation for decoded buffers.
//!
//! Takes ownership of the input so the previous buffer is released as soon
//! as a transformed one replaces it. When nothing needs to change the input
//! is handed straight back.

use super::calculations::fit_within;
use super::params::Rotation;
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

/// Shrink `image` to fit `max_width x max_height`, preserving aspect ratio.
pub fn resize_bitmap(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    resize_bitmap_rotated(image, max_width, max_height, Rotation::None)
}

/// Shrink `image` to fit the bounds and rotate it clockwise in one step.
///
/// The bounds apply to the *rotated* result: a 90° turn fits the source
/// into `max_height x max_width` before turning it.
pub fn resize_bitmap_rotated(
    image: DynamicImage,
    max_width: u32,
    max_height: u32,
    rotation: Rotation,
) -> DynamicImage {
    let (src_w, src_h) = (image.width(), image.height());
    let plan = fit_within((src_w, src_h), (max_width, max_height), rotation);

    debug!(
        src_width = src_w,
        src_height = src_h,
        dst_width = plan.width,
        dst_height = plan.height,
        rotation = rotation.degrees(),
        "resize plan"
    );

    if !plan.needs_resize && rotation == Rotation::None {
        return image;
    }

    let scaled = if plan.needs_resize {
        image.resize_exact(plan.width, plan.height, FilterType::Lanczos3)
    } else {
        image
    };

    match rotation {
        Rotation::None => scaled,
        Rotation::Cw90 => scaled.rotate90(),
        Rotation::Cw180 => scaled.rotate180(),
        Rotation::Cw270 => scaled.rotate270(),
    }
}
