//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode JPEG | `jpeg_decoder::Decoder::scale` (1/8, 1/4, 1/2 or full size while decoding) |
//! | Decode PNG, GIF, WebP, BMP, TIFF | `ImageReader::decode` under `Limits::max_alloc`, format guessed from content |
//! | Down-sample to the exact sample size | `DynamicImage::resize_exact` with `Triangle` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//!
//! ## Memory budget
//!
//! Allocation failures abort a Rust process instead of unwinding, so the
//! backend refuses to produce a decoded buffer larger than its budget and
//! reports [`BackendError::OutOfMemory`]. The caller then retries with a
//! coarser sample size.
//!
//! Only JPEG can be decoded at reduced resolution, so only JPEG benefits
//! from a coarser sample size: the scaled output is checked against the
//! budget before decoding and the decoder is capped at it. Every other
//! format is decoded at full resolution with `max_alloc` set to the budget,
//! so a source too large for the budget fails at every sample size.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::sampled_dimensions;
use super::params::{OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageError, ImageFormat, ImageReader, Limits, RgbImage};
use jpeg_decoder::PixelFormat;
use std::io::{Cursor, Write};

/// Bytes per decoded pixel (RGBA8).
const BYTES_PER_PIXEL: u64 = 4;

/// Default decode budget: a 4096x4096 RGBA buffer.
pub const DEFAULT_MEMORY_BUDGET: u64 = 64 * 1024 * 1024;

/// Codec backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    memory_budget: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
        }
    }

    /// Backend refusing decodes whose sampled RGBA buffer exceeds `bytes`.
    pub fn with_memory_budget(bytes: u64) -> Self {
        Self {
            memory_budget: bytes,
        }
    }

    pub fn memory_budget(&self) -> u64 {
        self.memory_budget
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(BackendError::Io)
}

fn decode_error(err: ImageError, dims: (u32, u32), sample_size: u32) -> BackendError {
    match err {
        ImageError::Limits(_) => BackendError::OutOfMemory {
            width: dims.0,
            height: dims.1,
            sample_size,
        },
        ImageError::IoError(e) => BackendError::Io(e),
        other => BackendError::ProcessingFailed(format!("Failed to decode image: {other}")),
    }
}

fn png_compression(quality: Quality) -> CompressionType {
    match quality.value() {
        90.. => CompressionType::Best,
        50.. => CompressionType::Default,
        _ => CompressionType::Fast,
    }
}

impl RustBackend {
    fn out_of_memory(dims: Dimensions, sample_size: u32) -> BackendError {
        BackendError::OutOfMemory {
            width: dims.width,
            height: dims.height,
            sample_size,
        }
    }

    /// Decode a JPEG at the smallest DCT scale covering `target`.
    ///
    /// `None` for pixel formats the `image` decoder handles better (CMYK,
    /// 16-bit luma); those fall back to [`Self::decode_full`].
    fn decode_jpeg_scaled(
        &self,
        data: &[u8],
        dims: Dimensions,
        sample_size: u32,
        target: (u32, u32),
    ) -> Result<Option<DynamicImage>, BackendError> {
        let mut decoder = jpeg_decoder::Decoder::new(data);
        let (w, h) = decoder
            .scale(to_u16(target.0), to_u16(target.1))
            .map_err(jpeg_error)?;
        let (w, h) = (u32::from(w), u32::from(h));

        if u64::from(w) * u64::from(h) * BYTES_PER_PIXEL > self.memory_budget {
            return Err(Self::out_of_memory(dims, sample_size));
        }
        let pixel_format = decoder
            .info()
            .ok_or_else(|| BackendError::ProcessingFailed("JPEG header not read".to_string()))?
            .pixel_format;
        if !matches!(pixel_format, PixelFormat::L8 | PixelFormat::RGB24) {
            return Ok(None);
        }

        decoder.set_max_decoding_buffer_size(usize::try_from(self.memory_budget).unwrap_or(usize::MAX));
        let pixels = decoder.decode().map_err(jpeg_error)?;
        let img = match pixel_format {
            PixelFormat::L8 => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
            _ => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        };
        img.map(Some).ok_or_else(|| {
            BackendError::ProcessingFailed(format!("JPEG pixel data does not match {w}x{h}"))
        })
    }

    /// Full-resolution decode with the budget as the allocation limit.
    fn decode_full(
        &self,
        data: &[u8],
        dims: Dimensions,
        sample_size: u32,
    ) -> Result<DynamicImage, BackendError> {
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.memory_budget);

        let mut reader = reader(data)?;
        reader.limits(limits);
        reader
            .decode()
            .map_err(|e| decode_error(e, (dims.width, dims.height), sample_size))
    }
}

fn to_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn jpeg_error(err: jpeg_decoder::Error) -> BackendError {
    match err {
        jpeg_decoder::Error::Io(e) => BackendError::Io(e),
        other => BackendError::ProcessingFailed(format!("Failed to decode JPEG: {other}")),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(data)?.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {e}"))
        })?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, data: &[u8], sample_size: u32) -> Result<DynamicImage, BackendError> {
        let sample_size = sample_size.max(1);
        let dims = self.identify(data)?;
        let (sw, sh) = sampled_dimensions((dims.width, dims.height), sample_size);

        let scaled = match image::guess_format(data) {
            Ok(ImageFormat::Jpeg) => self.decode_jpeg_scaled(data, dims, sample_size, (sw, sh))?,
            _ => None,
        };
        let img = match scaled {
            Some(img) => img,
            None => self.decode_full(data, dims, sample_size)?,
        };

        if (img.width(), img.height()) == (sw, sh) {
            return Ok(img);
        }
        Ok(img.resize_exact(sw, sh, FilterType::Triangle))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
        out: &mut dyn Write,
    ) -> Result<(), BackendError> {
        let result = match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(out, quality.value() as u8))
            }
            OutputFormat::Png => {
                let encoder =
                    PngEncoder::new_with_quality(out, png_compression(quality), PngFilter::Adaptive);
                if image.color().has_alpha() {
                    DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)
                } else {
                    DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
                }
            }
        };
        result.map_err(|e| match e {
            ImageError::IoError(io) => BackendError::Io(io),
            other => BackendError::ProcessingFailed(format!(
                "{} encode failed: {other}",
                format.extension()
            )),
        })
    }
}
