//! Image processing on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Decode + down-sample** | `ImageReader::decode` + `resize_exact` (Triangle) |
//! | **Resize + rotate** | Lanczos3 + `rotate90`/`rotate180`/`rotate270` |
//! | **Circle mask** | supersampled coverage on an RGBA buffer |
//! | **Encode** | `JpegEncoder` / `PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Transform / Circle**: Pixel operations on decoded buffers
//! - **Operations**: High-level functions combining sources, calculations and backend

pub mod backend;
mod calculations;
pub mod circle;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod transform;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    FitPlan, TALL_RATIO, band_rows, circle_coverage, fit_within, is_tall, sample_size,
    sampled_dimensions,
};
pub use circle::{EmptyTarget, circular_bitmap, circular_bitmap_sized};
pub use operations::{
    ImagingError, decode_bands, decode_bitmap, file_extension_from_url, image_dimensions, is_gif,
    is_super_long, load_bitmap, save_image, save_jpeg, save_png, suggest_sample_size,
};
pub use params::{DecodeRequest, InvalidRotation, OutputFormat, Quality, Rotation};
pub use rust_backend::RustBackend;
pub use transform::{resize_bitmap, resize_bitmap_rotated};
