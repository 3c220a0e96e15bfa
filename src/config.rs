//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` only needs the keys it overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [decode]
//! max_width = 800           # Decoded photos are shrunk to fit these bounds
//! max_height = 1024
//! max_passes = 10           # Out-of-memory retries with a coarser sample size
//! memory_budget_mb = 64     # Allocation cap for a single decode
//! band_height = 1024        # Row height when splitting very tall images
//!
//! [output]
//! image_dir = "images"      # Where saved photos go
//! crop_dir = "crop"         # Sub-directory of image_dir for crop targets
//! jpeg_quality = 70
//! png_quality = 90
//!
//! [network]
//! connect_timeout_secs = 5
//! max_redirects = 1         # 301/302/303 hops followed when opening a URL
//! user_agent = "photokit"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::imaging::{DecodeRequest, OutputFormat, Quality};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KitConfig {
    /// Decode bounds and out-of-memory retry settings.
    pub decode: DecodeConfig,
    /// Where and how images are written.
    pub output: OutputConfig,
    /// Remote source settings.
    pub network: NetworkConfig,
}

impl KitConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.decode;
        if d.max_width == 0 || d.max_height == 0 {
            return Err(ConfigError::Validation(
                "decode.max_width and decode.max_height must be non-zero".into(),
            ));
        }
        if d.memory_budget_mb == 0 {
            return Err(ConfigError::Validation(
                "decode.memory_budget_mb must be non-zero".into(),
            ));
        }
        if d.band_height == 0 {
            return Err(ConfigError::Validation(
                "decode.band_height must be non-zero".into(),
            ));
        }
        for (key, value) in [
            ("output.jpeg_quality", self.output.jpeg_quality),
            ("output.png_quality", self.output.png_quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        Ok(())
    }
}

/// Decode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// Retries after an out-of-memory decode, each with sample size + 1.
    pub max_passes: u32,
    /// Decode budget in MiB: caps the scaled JPEG buffer, or the
    /// full-resolution buffer for formats without scaled decoding.
    pub memory_budget_mb: u64,
    /// Rows per band when splitting very tall images.
    pub band_height: u32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 1024,
            max_passes: 10,
            memory_budget_mb: 64,
            band_height: 1024,
        }
    }
}

impl DecodeConfig {
    pub fn memory_budget_bytes(&self) -> u64 {
        self.memory_budget_mb.saturating_mul(1024 * 1024)
    }

    /// A decode request with these bounds and no rotation.
    pub fn request(&self) -> DecodeRequest {
        DecodeRequest {
            max_width: self.max_width,
            max_height: self.max_height,
            max_passes: self.max_passes,
            ..DecodeRequest::default()
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub image_dir: PathBuf,
    /// Relative to `image_dir`.
    pub crop_dir: PathBuf,
    pub jpeg_quality: u32,
    pub png_quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("images"),
            crop_dir: PathBuf::from("crop"),
            jpeg_quality: Quality::JPEG.value(),
            png_quality: Quality::PNG.value(),
        }
    }
}

impl OutputConfig {
    /// Encoding quality for `format`.
    pub fn quality(&self, format: OutputFormat) -> Quality {
        match format {
            OutputFormat::Jpeg => Quality::new(self.jpeg_quality),
            OutputFormat::Png => Quality::new(self.png_quality),
        }
    }
}

/// Remote source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub connect_timeout_secs: u64,
    /// How many 301/302/303 responses are followed when opening a URL.
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            max_redirects: 1,
            user_agent: "photokit".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(KitConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<KitConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: KitConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in `dir`, layered over stock defaults.
pub fn load_config(dir: &Path) -> Result<KitConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photokit configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Decoding
# ---------------------------------------------------------------------------
[decode]
# Decoded photos are shrunk (never enlarged) to fit these bounds.
max_width = 800
max_height = 1024

# When a decode would not fit the memory budget, retry with the sample size
# increased by one, at most this many times.
max_passes = 10

# Allocation cap for one decode, in MiB. JPEG is decoded at 1/2, 1/4 or 1/8
# scale to fit it; other formats must fit at full resolution.
memory_budget_mb = 64

# Rows per band when splitting very tall images.
band_height = 1024

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory saved photos are written to.
image_dir = "images"

# Crop targets live in this sub-directory of image_dir.
crop_dir = "crop"

# JPEG quality (1-100).
jpeg_quality = 70

# PNG is lossless: 90 and above selects the best compression.
png_quality = 90

# ---------------------------------------------------------------------------
# Network
# ---------------------------------------------------------------------------
[network]
connect_timeout_secs = 5

# 301/302/303 responses followed when opening a remote image.
max_redirects = 1

user_agent = "photokit"
"##
}
