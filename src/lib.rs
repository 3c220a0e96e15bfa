//! # Photokit
//!
//! Load, shrink, reshape and store photos without running out of memory.
//! Images arrive as local files, `content://` handles or HTTP(S) URLs; they
//! leave as JPEG or PNG files under a timestamp-named image directory.
//!
//! # Architecture: Source → Bitmap → File
//!
//! ```text
//! 1. Open     path / content:// / https://  →  byte stream   (source, remote)
//! 2. Decode   bytes  →  DynamicImage, sampled down to fit     (imaging)
//! 3. Shape    resize, rotate, circle-crop                      (imaging)
//! 4. Save     DynamicImage  →  <image_dir>/<millis>.jpg        (naming)
//! ```
//!
//! Every stage can be used on its own. The CLI in `main.rs` chains them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Parses paths/URIs into [`source::ImageSource`] and opens them as streams |
//! | [`remote`] | HTTP(S) streaming with bounded redirects, whole-body downloads |
//! | [`imaging`] | Dimension math, sampled decoding with retry, resize/rotate, circle masks, encoding |
//! | [`naming`] | Timestamp file names and the on-disk [`naming::ImageStore`] |
//! | [`config`] | Layered `config.toml` loading and validation |
//! | [`output`] | CLI output formatting, text and JSON |
//!
//! # Design Decisions
//!
//! ## Sampled Decoding With Retry
//!
//! Large photos are decoded at an integer sample size: a sample of `n` keeps
//! every `n`th pixel in each direction. For JPEG the decoder itself works at
//! the reduced scale, so the decoded buffer shrinks by roughly `n²`. The first
//! sample is chosen from the source width and the requested maximum. If the
//! backend still reports [`imaging::BackendError::OutOfMemory`], the sample is
//! bumped by one and the decode retried, up to `max_passes` times.
//!
//! ## Memory Budget Instead of Catching OOM
//!
//! Rust aborts on allocation failure, so "out of memory" is a budget check
//! (64 MiB by default, configurable). [`imaging::RustBackend`] decodes JPEG
//! directly at 1/2, 1/4 or 1/8 scale and refuses any scale whose buffer
//! exceeds the budget. Other formats have no reduced-resolution decode: they
//! are decoded at full size with the budget as the allocation limit, so a
//! source too large for it fails at every sample size.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` crate, with
//! `jpeg-decoder` for scaled JPEG decoding. No system libraries, no
//! ImageMagick.
//!
//! ## Backend Trait
//!
//! All pixel work goes through [`imaging::ImageBackend`]. The retry loop,
//! naming and CLI are tested against a recording mock; the real backend is
//! tested separately against generated images.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod remote;
pub mod source;

#[cfg(test)]
pub(crate) mod test_helpers;
