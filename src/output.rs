//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! photos/pano.jpg
//!     Size: 4000x1200
//!     Sample size: 5
//!     Tall: no
//!     GIF: no
//! ```
//!
//! ## Resize / Circle / Save
//!
//! ```text
//! photos/pano.jpg → out.jpg (800x240 JPEG)
//! ```
//!
//! ## Fetch
//!
//! ```text
//! https://example.com/a.png → a.png (48213 bytes)
//! ```
//!
//! ## Bands
//!
//! ```text
//! photos/scroll.png → 3 bands
//!     001 bands/band-001.jpg (600x1024)
//!     002 bands/band-002.jpg (600x1024)
//!     003 bands/band-003.jpg (600x52)
//! ```

use crate::imaging::{Dimensions, OutputFormat, is_gif, is_tall, sample_size};
use crate::source::ImageSource;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What `info` reports about a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReport {
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// Sample size a decode bounded by the configured max width would start at.
    pub sample_size: u32,
    pub tall: bool,
    pub gif: bool,
}

impl ImageReport {
    pub fn new(source: &ImageSource, dims: Dimensions, max_width: u32) -> Self {
        let uri = source.uri();
        Self {
            gif: is_gif(&uri),
            source: uri,
            width: dims.width,
            height: dims.height,
            sample_size: sample_size(dims.width, max_width),
            tall: is_tall(dims.width, dims.height),
        }
    }
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn format_label(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Jpeg => "JPEG",
        OutputFormat::Png => "PNG",
    }
}

pub fn format_info(report: &ImageReport) -> Vec<String> {
    vec![
        report.source.clone(),
        format!("{}Size: {}x{}", indent(1), report.width, report.height),
        format!("{}Sample size: {}", indent(1), report.sample_size),
        format!("{}Tall: {}", indent(1), yes_no(report.tall)),
        format!("{}GIF: {}", indent(1), yes_no(report.gif)),
    ]
}

pub fn format_info_json(report: &ImageReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// One line for a single written file.
pub fn format_saved(source: &str, path: &Path, dims: (u32, u32), format: OutputFormat) -> Vec<String> {
    vec![format!(
        "{} → {} ({}x{} {})",
        source,
        path.display(),
        dims.0,
        dims.1,
        format_label(format)
    )]
}

/// One line for a downloaded file.
pub fn format_fetched(url: &str, path: &Path, bytes: usize) -> Vec<String> {
    vec![format!("{} → {} ({} bytes)", url, path.display(), bytes)]
}

/// Header plus one indexed line per band file.
pub fn format_bands(source: &str, bands: &[(PathBuf, (u32, u32))]) -> Vec<String> {
    let noun = if bands.len() == 1 { "band" } else { "bands" };
    let mut lines = vec![format!("{} → {} {}", source, bands.len(), noun)];
    for (i, (path, (w, h))) in bands.iter().enumerate() {
        lines.push(format!(
            "{}{:0>3} {} ({}x{})",
            indent(1),
            i + 1,
            path.display(),
            w,
            h
        ));
    }
    lines
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_info(report: &ImageReport) {
    print_lines(format_info(report));
}

pub fn print_saved(source: &str, path: &Path, dims: (u32, u32), format: OutputFormat) {
    print_lines(format_saved(source, path, dims, format));
}

pub fn print_fetched(url: &str, path: &Path, bytes: usize) {
    print_lines(format_fetched(url, path, bytes));
}

pub fn print_bands(source: &str, bands: &[(PathBuf, (u32, u32))]) {
    print_lines(format_bands(source, bands));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(source: &str, width: u32, height: u32) -> ImageReport {
        ImageReport::new(
            &ImageSource::parse(source).unwrap(),
            Dimensions { width, height },
            800,
        )
    }

    #[test]
    fn report_classifies_source() {
        let r = report("https://example.com/anim.GIF?x=1", 4000, 13000);
        assert_eq!(r.source, "https://example.com/anim.GIF?x=1");
        assert_eq!(r.sample_size, 5);
        assert!(r.tall);
        assert!(r.gif);
    }

    #[test]
    fn report_small_image_needs_no_sampling() {
        let r = report("photos/a.jpg", 640, 480);
        assert_eq!(r.sample_size, 1);
        assert!(!r.tall);
        assert!(!r.gif);
    }

    #[test]
    fn info_lines() {
        let lines = format_info(&report("photos/pano.jpg", 4000, 1200));
        assert_eq!(
            lines,
            vec![
                "photos/pano.jpg",
                "    Size: 4000x1200",
                "    Sample size: 5",
                "    Tall: no",
                "    GIF: no",
            ]
        );
    }

    #[test]
    fn info_json_has_all_fields() {
        let json = format_info_json(&report("photos/pano.jpg", 4000, 1200)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["width"], 4000);
        assert_eq!(value["height"], 1200);
        assert_eq!(value["sample_size"], 5);
        assert_eq!(value["tall"], false);
        assert_eq!(value["gif"], false);
    }

    #[test]
    fn saved_line() {
        let lines = format_saved(
            "photos/pano.jpg",
            Path::new("out.png"),
            (800, 240),
            OutputFormat::Png,
        );
        assert_eq!(lines, vec!["photos/pano.jpg → out.png (800x240 PNG)"]);
    }

    #[test]
    fn fetched_line() {
        assert_eq!(
            format_fetched("https://example.com/a.png", Path::new("a.png"), 512),
            vec!["https://example.com/a.png → a.png (512 bytes)"]
        );
    }

    #[test]
    fn bands_lines() {
        let bands = vec![
            (PathBuf::from("bands/band-001.jpg"), (600, 1024)),
            (PathBuf::from("bands/band-002.jpg"), (600, 52)),
        ];
        let lines = format_bands("scroll.png", &bands);
        assert_eq!(lines[0], "scroll.png → 2 bands");
        assert_eq!(lines[1], "    001 bands/band-001.jpg (600x1024)");
        assert_eq!(lines[2], "    002 bands/band-002.jpg (600x52)");
    }

    #[test]
    fn single_band_is_singular() {
        let bands = vec![(PathBuf::from("b.jpg"), (10, 10))];
        assert_eq!(format_bands("a.jpg", &bands)[0], "a.jpg → 1 band");
    }
}
