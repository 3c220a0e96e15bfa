//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three codec operations everything
//! else is built on: identify, decode (with down-sampling), and encode.
//! Pixel transforms (resize, rotate, circular masks) are plain functions on
//! [`DynamicImage`] and do not go through the backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{OutputFormat, Quality};
use image::DynamicImage;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Out of memory decoding {width}x{height} at sample size {sample_size}")]
    OutOfMemory {
        width: u32,
        height: u32,
        sample_size: u32,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image codec backends.
///
/// Backends work on in-memory encoded bytes so that a failed decode can be
/// retried without caring whether the source stream was seekable.
pub trait ImageBackend: Sync {
    /// Read image dimensions from the header without decoding pixels.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode at `sample_size` (1 = full resolution, 2 = half, ...).
    ///
    /// Must fail with [`BackendError::OutOfMemory`] when the sampled buffer
    /// does not fit the backend's memory budget.
    fn decode(&self, data: &[u8], sample_size: u32) -> Result<DynamicImage, BackendError>;

    /// Encode `image` into `out`.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
        out: &mut dyn Write,
    ) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::calculations::sampled_dimensions;
    use std::sync::Mutex;

    /// Mock backend that records operations and fabricates blank images.
    ///
    /// `decode` fails with out-of-memory for the first `oom_failures` calls.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: Mutex<Option<Dimensions>>,
        pub oom_failures: Mutex<u32>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify,
        Decode { sample_size: u32 },
        Encode { format: OutputFormat, quality: u32 },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: Mutex::new(Some(Dimensions { width, height })),
                ..Self::default()
            }
        }

        pub fn failing_with_oom(width: u32, height: u32, failures: u32) -> Self {
            Self {
                dimensions: Mutex::new(Some(Dimensions { width, height })),
                oom_failures: Mutex::new(failures),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn decode_samples(&self) -> Vec<u32> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Decode { sample_size } => Some(sample_size),
                    _ => None,
                })
                .collect()
        }

        fn dims(&self) -> Result<Dimensions, BackendError> {
            self.dimensions
                .lock()
                .unwrap()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, _data: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Identify);
            self.dims()
        }

        fn decode(&self, _data: &[u8], sample_size: u32) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode { sample_size });

            let dims = self.dims()?;
            let mut failures = self.oom_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(BackendError::OutOfMemory {
                    width: dims.width,
                    height: dims.height,
                    sample_size,
                });
            }

            let (w, h) = sampled_dimensions((dims.width, dims.height), sample_size);
            Ok(DynamicImage::new_rgb8(w, h))
        }

        fn encode(
            &self,
            _image: &DynamicImage,
            format: OutputFormat,
            quality: Quality,
            out: &mut dyn Write,
        ) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format,
                quality: quality.value(),
            });
            out.write_all(b"mock")?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(800, 600);

        let result = backend.identify(b"").unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        assert_eq!(backend.get_operations(), vec![RecordedOp::Identify]);
    }

    #[test]
    fn mock_decode_applies_sample_size() {
        let backend = MockBackend::with_dimensions(1000, 500);

        let img = backend.decode(b"", 4).unwrap();
        assert_eq!((img.width(), img.height()), (250, 125));
        assert_eq!(backend.decode_samples(), vec![4]);
    }

    #[test]
    fn mock_fails_with_oom_then_recovers() {
        let backend = MockBackend::failing_with_oom(100, 100, 1);

        assert!(matches!(
            backend.decode(b"", 1),
            Err(BackendError::OutOfMemory { sample_size: 1, .. })
        ));
        assert!(backend.decode(b"", 2).is_ok());
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let mut out = Vec::new();

        backend
            .encode(
                &DynamicImage::new_rgb8(1, 1),
                OutputFormat::Png,
                Quality::PNG,
                &mut out,
            )
            .unwrap();

        assert_eq!(out, b"mock");
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                format: OutputFormat::Png,
                quality: 90
            }]
        );
    }
}
