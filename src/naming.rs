//! Output file naming and the on-disk image store.
//!
//! Saved photos are named by the capture time in Unix milliseconds:
//! `1760000000123.jpg`. Callers pass the timestamp in, so naming stays
//! deterministic under test; the CLI passes `Utc::now()`.
//!
//! ## Layout
//!
//! ```text
//! <image_dir>/
//! ├── 1760000000123.jpg     # save_bitmap / image_file
//! ├── avatar.png            # image_file_named
//! └── <crop_dir>/
//!     └── 1760000000456.jpg # crop_uri
//! ```

use crate::config::OutputConfig;
use crate::imaging::{ImageBackend, ImagingError, Quality, save_jpeg};
use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use url::Url;

/// Timestamp file name: `<unix-millis>.jpg`.
pub fn generate_file_name(now: DateTime<Utc>) -> String {
    format!("{}.jpg", now.timestamp_millis())
}

fn file_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// Directory of saved images, with a sub-directory for crop targets.
#[derive(Debug, Clone)]
pub struct ImageStore {
    image_dir: PathBuf,
    crop_dir: PathBuf,
    jpeg_quality: Quality,
}

impl ImageStore {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        let image_dir = image_dir.into();
        Self {
            crop_dir: image_dir.join("crop"),
            image_dir,
            jpeg_quality: Quality::JPEG,
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            image_dir: output.image_dir.clone(),
            crop_dir: output.image_dir.join(&output.crop_dir),
            jpeg_quality: Quality::new(output.jpeg_quality),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn crop_dir(&self) -> &Path {
        &self.crop_dir
    }

    /// A fresh timestamp-named file in the image directory.
    pub fn image_file(&self, now: DateTime<Utc>) -> PathBuf {
        self.image_dir.join(generate_file_name(now))
    }

    pub fn image_file_named(&self, file_name: &str) -> PathBuf {
        self.image_dir.join(file_name)
    }

    /// `file://` URI of a fresh timestamp-named file.
    ///
    /// `None` when the image directory is relative (file URIs must be absolute).
    pub fn image_file_uri(&self, now: DateTime<Utc>) -> Option<Url> {
        file_uri(&self.image_file(now))
    }

    pub fn image_file_uri_named(&self, file_name: &str) -> Option<Url> {
        file_uri(&self.image_file_named(file_name))
    }

    /// `<image_dir>/<file_name>` as a string.
    pub fn image_path(&self, file_name: &str) -> String {
        self.image_file_named(file_name)
            .to_string_lossy()
            .into_owned()
    }

    /// `file://` URI of a fresh timestamp-named file in the crop directory.
    pub fn crop_uri(&self, now: DateTime<Utc>) -> Option<Url> {
        file_uri(&self.crop_dir.join(generate_file_name(now)))
    }

    /// Save `image` as a JPEG under a fresh timestamp name.
    ///
    /// Creates the image directory if needed and returns the written path.
    pub fn save_bitmap(
        &self,
        backend: &impl ImageBackend,
        image: &DynamicImage,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, ImagingError> {
        std::fs::create_dir_all(&self.image_dir).map_err(|source| ImagingError::Write {
            path: self.image_dir.clone(),
            source,
        })?;
        save_jpeg(backend, image, &self.image_file(now), self.jpeg_quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::test_helpers::gradient_image;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn file_name_is_unix_millis() {
        assert_eq!(generate_file_name(at_millis(1_760_000_000_123)), "1760000000123.jpg");
    }

    #[test]
    fn store_paths() {
        let store = ImageStore::new("/data/images");
        let now = at_millis(42);

        assert_eq!(store.image_file(now), PathBuf::from("/data/images/42.jpg"));
        assert_eq!(
            store.image_file_named("avatar.png"),
            PathBuf::from("/data/images/avatar.png")
        );
        assert_eq!(store.image_path("avatar.png"), "/data/images/avatar.png");
    }

    #[test]
    fn store_uris() {
        let store = ImageStore::new("/data/images");
        let now = at_millis(7);

        assert_eq!(
            store.image_file_uri(now).unwrap().as_str(),
            "file:///data/images/7.jpg"
        );
        assert_eq!(
            store.image_file_uri_named("a.jpg").unwrap().as_str(),
            "file:///data/images/a.jpg"
        );
        assert_eq!(
            store.crop_uri(now).unwrap().as_str(),
            "file:///data/images/crop/7.jpg"
        );
    }

    #[test]
    fn relative_store_has_no_uri() {
        let store = ImageStore::new("images");
        assert!(store.image_file_uri(at_millis(1)).is_none());
    }

    #[test]
    fn store_from_config_uses_crop_dir() {
        let output = OutputConfig {
            image_dir: PathBuf::from("/srv/photos"),
            crop_dir: PathBuf::from("cropped"),
            ..OutputConfig::default()
        };
        let store = ImageStore::from_config(&output);
        assert_eq!(store.crop_dir(), Path::new("/srv/photos/cropped"));
    }

    #[test]
    fn save_bitmap_creates_dir_and_writes_jpeg() {
        let tmp = TempDir::new().unwrap();
        let store = ImageStore::new(tmp.path().join("nested/images"));

        let path = store
            .save_bitmap(&RustBackend::new(), &gradient_image(30, 20), at_millis(99))
            .unwrap();

        assert_eq!(path, tmp.path().join("nested/images/99.jpg"));
        assert_eq!(image::image_dimensions(&path).unwrap(), (30, 20));
    }
}
