//! High-level image operations.
//!
//! These functions combine sources, calculations, and backend execution:
//! open a source, decode it with down-sampling, fit it to bounds, classify
//! it, and write results to disk.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{band_rows, is_tall, sample_size};
use super::circle::EmptyTarget;
use super::params::{DecodeRequest, OutputFormat, Quality};
use super::transform::resize_bitmap_rotated;
use crate::source::{ImageSource, SourceError, SourceOpener};
use image::DynamicImage;
use std::borrow::Cow;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Circle(#[from] EmptyTarget),
    #[error("Still out of memory after {retries} retries (last sample size {sample_size})")]
    PassesExhausted { retries: u32, sample_size: u32 },
    #[error("Cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Sample size that brings the encoded image's width down to `max_width`.
pub fn suggest_sample_size(backend: &impl ImageBackend, data: &[u8], max_width: u32) -> Result<u32> {
    let dims = backend.identify(data)?;
    let sample = sample_size(dims.width, max_width);
    debug!(width = dims.width, max_width, sample, "sample size");
    Ok(sample)
}

/// Run the decode passes: every out-of-memory bumps the sample size by one.
///
/// `fetch` is called once per pass so callers decide whether a retry reopens
/// the source or reuses bytes already in memory.
fn decode_with_retry<'a>(
    backend: &impl ImageBackend,
    request: &DecodeRequest,
    label: &dyn Display,
    mut fetch: impl FnMut() -> Result<Cow<'a, [u8]>>,
) -> Result<DynamicImage> {
    let mut sample = request.sample_size.max(1);

    for pass in 0..=request.max_passes {
        let data = fetch()?;
        match backend.decode(&data, sample) {
            Ok(decoded) => {
                return Ok(resize_bitmap_rotated(
                    decoded,
                    request.max_width,
                    request.max_height,
                    request.rotation,
                ));
            }
            Err(BackendError::OutOfMemory { .. }) => {
                warn!(source = %label, pass, sample_size = sample, "out of memory decoding, retrying with coarser sampling");
                sample += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ImagingError::PassesExhausted {
        retries: request.max_passes,
        sample_size: sample - 1,
    })
}

/// Decode `source` and fit it to the request's bounds and rotation.
///
/// Decoding starts at `request.sample_size`. When the backend runs out of
/// memory the stream is closed, the sample size goes up by one, and the
/// source is opened again, for at most `request.max_passes` retries.
pub fn decode_bitmap(
    backend: &impl ImageBackend,
    opener: &SourceOpener,
    source: &ImageSource,
    request: &DecodeRequest,
) -> Result<DynamicImage> {
    decode_with_retry(backend, request, source, || {
        Ok(Cow::Owned(opener.read_all(source)?))
    })
}

/// Read `source` once, pick a sample size from its width, and decode it.
///
/// Retries reuse the bytes already read, so remote sources are fetched once.
pub fn load_bitmap(
    backend: &impl ImageBackend,
    opener: &SourceOpener,
    source: &ImageSource,
    request: &DecodeRequest,
) -> Result<DynamicImage> {
    let data = opener.read_all(source)?;
    let request = DecodeRequest {
        sample_size: suggest_sample_size(backend, &data, request.max_width)?,
        ..request.clone()
    };
    decode_with_retry(backend, &request, source, || Ok(Cow::Borrowed(&data[..])))
}

/// Decode at full resolution and split into horizontal bands of
/// `band_height` rows, top to bottom.
pub fn decode_bands(
    backend: &impl ImageBackend,
    data: &[u8],
    band_height: u32,
) -> Result<Vec<DynamicImage>> {
    let image = backend.decode(data, 1)?;
    let width = image.width();
    Ok(band_rows(image.height(), band_height)
        .into_iter()
        .map(|(top, bottom)| image.crop_imm(0, top, width, bottom - top))
        .collect())
}

/// Dimensions of `source` from its header.
pub fn image_dimensions(
    backend: &impl ImageBackend,
    opener: &SourceOpener,
    source: &ImageSource,
) -> Result<Dimensions> {
    let data = opener.read_all(source)?;
    Ok(backend.identify(&data)?)
}

/// Whether `source` is more than three times taller than wide.
///
/// Failures to open or identify the source are logged and count as `false`.
pub fn is_super_long(
    backend: &impl ImageBackend,
    opener: &SourceOpener,
    source: &ImageSource,
) -> bool {
    match image_dimensions(backend, opener, source) {
        Ok(dims) => is_tall(dims.width, dims.height),
        Err(e) => {
            warn!(source = %source, error = %e, "cannot read image bounds");
            false
        }
    }
}

/// File extension of the last path segment of `url`.
///
/// Query and fragment are ignored. Filenames with characters outside
/// `[A-Za-z0-9_.\-()%]` have no extension.
pub fn file_extension_from_url(url: &str) -> Option<&str> {
    let url = url.split('#').next().unwrap_or_default();
    let url = url.split('?').next().unwrap_or_default();
    let filename = url.rsplit('/').next().unwrap_or_default();

    let allowed = |c: char| c.is_ascii_alphanumeric() || "_.-()%".contains(c);
    if filename.is_empty() || !filename.chars().all(allowed) {
        return None;
    }
    filename.rfind('.').map(|dot| &filename[dot + 1..])
}

/// Whether `url` names a GIF, judged by its extension.
pub fn is_gif(url: &str) -> bool {
    file_extension_from_url(url).is_some_and(|ext| ext.eq_ignore_ascii_case("gif"))
}

/// Encode `image` to `path`, replacing any existing file.
pub fn save_image(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: Quality,
) -> Result<PathBuf> {
    let write_err = |source| ImagingError::Write {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        fs::remove_file(path).map_err(write_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    backend.encode(image, format, quality, &mut writer)?;
    writer.flush().map_err(write_err)?;

    debug!(path = %path.display(), format = format.extension(), quality = quality.value(), "saved");
    Ok(path.to_path_buf())
}

/// Save as JPEG.
pub fn save_jpeg(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    path: &Path,
    quality: Quality,
) -> Result<PathBuf> {
    save_image(backend, image, path, OutputFormat::Jpeg, quality)
}

/// Save as PNG.
pub fn save_png(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    path: &Path,
    quality: Quality,
) -> Result<PathBuf> {
    save_image(backend, image, path, OutputFormat::Png, quality)
}
