//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how*. They are the interface
//! between the high-level [`operations`](super::operations) module and the
//! [`backend`](super::backend) that does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`Rotation`]: Clockwise quarter turns applied while resizing.
//! - [`OutputFormat`]: JPEG or PNG, chosen explicitly or from a file extension.
//! - [`DecodeRequest`]: Bounds, rotation and retry budget for a decode.

use std::path::Path;
use thiserror::Error;

/// Quality setting for image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    /// JPEG quality used for saved photos.
    pub const JPEG: Quality = Quality(70);
    /// PNG quality used for saved PNGs (maps to compression effort).
    pub const PNG: Quality = Quality(90);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::JPEG
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported rotation: {0} degrees (expected a multiple of 90)")]
pub struct InvalidRotation(pub i32);

/// Clockwise rotation applied together with a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Build from degrees. Negative and >360 values are normalised first.
    pub fn from_degrees(degrees: i32) -> Result<Self, InvalidRotation> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            _ => Err(InvalidRotation(degrees)),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Quarter turns exchange width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Pick the format from a path's extension: `.png` is PNG, anything else JPEG.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }

    /// The quality this crate saves the format with.
    pub fn default_quality(self) -> Quality {
        match self {
            OutputFormat::Jpeg => Quality::JPEG,
            OutputFormat::Png => Quality::PNG,
        }
    }
}

/// Parameters for decoding a source into a bounded buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeRequest {
    pub max_width: u32,
    pub max_height: u32,
    pub rotation: Rotation,
    /// Initial down-sampling divisor; bumped by one on every out-of-memory retry.
    pub sample_size: u32,
    /// Retries allowed after the first attempt.
    pub max_passes: u32,
}

impl Default for DecodeRequest {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 1024,
            rotation: Rotation::None,
            sample_size: 1,
            max_passes: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_defaults_match_formats() {
        assert_eq!(Quality::default().value(), 70);
        assert_eq!(OutputFormat::Jpeg.default_quality().value(), 70);
        assert_eq!(OutputFormat::Png.default_quality().value(), 90);
    }

    #[test]
    fn rotation_normalises_degrees() {
        assert_eq!(Rotation::from_degrees(0), Ok(Rotation::None));
        assert_eq!(Rotation::from_degrees(450), Ok(Rotation::Cw90));
        assert_eq!(Rotation::from_degrees(-90), Ok(Rotation::Cw270));
        assert_eq!(Rotation::from_degrees(180).unwrap().degrees(), 180);
    }

    #[test]
    fn rotation_rejects_odd_angles() {
        assert_eq!(Rotation::from_degrees(45), Err(InvalidRotation(45)));
    }

    #[test]
    fn only_quarter_turns_swap_axes() {
        assert!(Rotation::Cw90.swaps_axes());
        assert!(Rotation::Cw270.swaps_axes());
        assert!(!Rotation::Cw180.swaps_axes());
        assert!(!Rotation::None.swaps_axes());
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a/avatar.PNG")), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path(Path::new("a/avatar.jpg")), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_path(Path::new("avatar")), OutputFormat::Jpeg);
    }

    #[test]
    fn decode_request_defaults() {
        let req = DecodeRequest::default();
        assert_eq!((req.max_width, req.max_height), (800, 1024));
        assert_eq!(req.sample_size, 1);
        assert_eq!(req.max_passes, 10);
    }
}
