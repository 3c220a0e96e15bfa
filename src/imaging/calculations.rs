//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Rotation;

/// Height-to-width ratio above which an image counts as "very tall".
pub const TALL_RATIO: f64 = 3.0;

/// Calculate the down-sampling divisor for a decode.
///
/// Returns the smallest integer `s >= 1` such that `width / s <= target_width`.
///
/// # Examples
/// ```
/// # use photokit::imaging::sample_size;
/// assert_eq!(sample_size(1600, 800), 2);
/// assert_eq!(sample_size(1601, 800), 3);
/// assert_eq!(sample_size(640, 800), 1);
/// ```
pub fn sample_size(width: u32, target_width: u32) -> u32 {
    if target_width == 0 {
        return 1;
    }
    width.div_ceil(target_width).max(1)
}

/// Dimensions of a buffer decoded at the given sample size.
///
/// Rounds up like JPEG scaled decoding does, and never goes below 1x1.
pub fn sampled_dimensions(source: (u32, u32), sample: u32) -> (u32, u32) {
    let sample = sample.max(1);
    let (w, h) = source;
    (w.div_ceil(sample).max(1), h.div_ceil(sample).max(1))
}

/// Outcome of fitting a source into bounding dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitPlan {
    /// Width to scale to, before rotation.
    pub width: u32,
    /// Height to scale to, before rotation.
    pub height: u32,
    pub needs_resize: bool,
}

/// Calculate a proportional target size that fits within `bounds`.
///
/// For quarter-turn rotations the bounds are swapped first, so the rotated
/// result fits the caller's bounds. When the source exceeds the bounds on
/// either axis, the axis with the larger overshoot is pinned to its bound and
/// the other one follows by the same factor (truncated). Sources that already
/// fit keep their size; nothing is ever upscaled.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32), rotation: Rotation) -> FitPlan {
    let (src_w, src_h) = source;
    let (mut dst_w, mut dst_h) = bounds;

    if rotation.swaps_axes() {
        std::mem::swap(&mut dst_w, &mut dst_h);
    }

    if src_w <= dst_w && src_h <= dst_h {
        return FitPlan {
            width: src_w,
            height: src_h,
            needs_resize: false,
        };
    }

    let ratio_w = src_w as f64 / dst_w.max(1) as f64;
    let ratio_h = src_h as f64 / dst_h.max(1) as f64;

    if ratio_w > ratio_h {
        let p = dst_w as f64 / src_w as f64;
        dst_h = ((src_h as f64 * p) as u32).max(1);
    } else {
        let p = dst_h as f64 / src_h as f64;
        dst_w = ((src_w as f64 * p) as u32).max(1);
    }

    FitPlan {
        width: dst_w.max(1),
        height: dst_h.max(1),
        needs_resize: true,
    }
}

/// Whether an image is "very tall" (height more than three times its width).
///
/// The ratio is compared as a fraction, so `100x301` is already tall.
pub fn is_tall(width: u32, height: u32) -> bool {
    if width == 0 {
        return false;
    }
    height as f64 / width as f64 > TALL_RATIO
}

/// Split `height` rows into bands of at most `band_height` rows.
///
/// Returns `(top, bottom)` pairs with `bottom` exclusive. The last band holds
/// the remainder.
pub fn band_rows(height: u32, band_height: u32) -> Vec<(u32, u32)> {
    if height == 0 || band_height == 0 {
        return Vec::new();
    }
    (0..height.div_ceil(band_height))
        .map(|i| {
            let top = i * band_height;
            (top, (top + band_height).min(height))
        })
        .collect()
}

/// Supersampling grid used for anti-aliased circle edges (per axis).
const COVERAGE_GRID: u32 = 4;

/// Fraction of the pixel at (`px`, `py`) covered by a circle.
///
/// The pixel spans `[px, px + 1) x [py, py + 1)`. Coverage is estimated by
/// sampling a regular 4x4 grid inside the pixel.
pub fn circle_coverage(px: u32, py: u32, cx: f32, cy: f32, radius: f32) -> f32 {
    let r2 = radius * radius;
    let step = 1.0 / COVERAGE_GRID as f32;
    let mut inside = 0u32;

    for sy in 0..COVERAGE_GRID {
        for sx in 0..COVERAGE_GRID {
            let x = px as f32 + (sx as f32 + 0.5) * step;
            let y = py as f32 + (sy as f32 + 0.5) * step;
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r2 {
                inside += 1;
            }
        }
    }

    inside as f32 / (COVERAGE_GRID * COVERAGE_GRID) as f32
}
