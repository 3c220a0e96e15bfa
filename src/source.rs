//! Image sources: local files, content-provider handles, and remote URLs.
//!
//! An [`ImageSource`] is parsed from the URI or path the caller was handed.
//! [`SourceOpener`] turns it into a byte stream:
//!
//! | Source | Syntax | Opened with |
//! |---|---|---|
//! | File | `/path/a.jpg`, `a.jpg`, `file:///path/a.jpg` | `std::fs::File` |
//! | Content | `content://authority/path` | a [`ContentResolver`] |
//! | Remote | `http://…`, `https://…` | [`remote::open_remote`](crate::remote::open_remote) |
//!
//! Content handles belong to whatever hosts the library (a media store, an
//! upload spool), so resolution is pluggable. [`DirectoryResolver`] maps
//! them onto a directory tree.

use crate::config::NetworkConfig;
use crate::remote;
use percent_encoding::percent_decode_str;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("No content resolver configured for {0}")]
    NoContentResolver(Url),
    #[error("Cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { url: Url, status: u16 },
    #[error("Redirect from {url} has no Location header")]
    MissingLocation { url: Url },
    #[error("Gave up on {url} after {limit} redirect(s)")]
    TooManyRedirects { url: Url, limit: u32 },
}

/// Where image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(PathBuf),
    Content(Url),
    Remote(Url),
}

impl ImageSource {
    /// Parse a path or URI.
    ///
    /// Strings without a scheme are local paths, as are single-letter
    /// "schemes" (Windows drive letters).
    pub fn parse(input: &str) -> Result<Self, SourceError> {
        match Url::parse(input) {
            Ok(url) => match url.scheme() {
                "file" => url
                    .to_file_path()
                    .map(ImageSource::File)
                    .map_err(|()| SourceError::InvalidUri {
                        uri: input.to_string(),
                        reason: "not a local file path".to_string(),
                    }),
                "content" => Ok(ImageSource::Content(url)),
                "http" | "https" => Ok(ImageSource::Remote(url)),
                scheme if scheme.len() == 1 => Ok(ImageSource::File(PathBuf::from(input))),
                other => Err(SourceError::UnsupportedScheme(other.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(ImageSource::File(PathBuf::from(input)))
            }
            Err(e) => Err(SourceError::InvalidUri {
                uri: input.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        ImageSource::File(path.into())
    }

    /// The source as a URI-ish string (paths stay paths).
    pub fn uri(&self) -> String {
        match self {
            ImageSource::File(path) => path.to_string_lossy().into_owned(),
            ImageSource::Content(url) | ImageSource::Remote(url) => url.to_string(),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Opens `content://` handles.
pub trait ContentResolver: Send + Sync {
    fn open(&self, uri: &Url) -> io::Result<Box<dyn Read + Send>>;
}

/// Resolves `content://authority/a/b` to `<root>/authority/a/b`.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a content URI to a path under the root.
    ///
    /// Segments are percent-decoded. Dot segments are normalised away by URL
    /// parsing; a decoded segment that is `.`/`..` or contains a path
    /// separator is rejected, so the result stays under `<root>/<authority>`.
    pub fn resolve(&self, uri: &Url) -> io::Result<PathBuf> {
        let authority = uri.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
            invalid_input(format!("content URI has no authority: {uri}"))
        })?;

        let mut path = self.root.join(authority);
        for segment in uri.path_segments().into_iter().flatten() {
            if segment.is_empty() {
                continue;
            }
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|e| invalid_input(format!("bad segment {segment:?} in {uri}: {e}")))?;
            if matches!(decoded.as_ref(), "." | "..")
                || decoded.contains(['/', '\\', '\0'])
            {
                return Err(invalid_input(format!(
                    "unsafe segment {decoded:?} in {uri}"
                )));
            }
            path.push(decoded.as_ref());
        }
        Ok(path)
    }
}

fn invalid_input(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

impl ContentResolver for DirectoryResolver {
    fn open(&self, uri: &Url) -> io::Result<Box<dyn Read + Send>> {
        let path = self.resolve(uri)?;
        Ok(Box::new(File::open(path)?))
    }
}

/// Opens [`ImageSource`]s as byte streams.
#[derive(Default)]
pub struct SourceOpener {
    network: NetworkConfig,
    resolver: Option<Box<dyn ContentResolver>>,
}

impl SourceOpener {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            network,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: impl ContentResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Open `source` for reading. The stream closes when dropped.
    pub fn open(&self, source: &ImageSource) -> Result<Box<dyn Read + Send>, SourceError> {
        match source {
            ImageSource::File(path) => open_file(path),
            ImageSource::Content(uri) => {
                let resolver = self
                    .resolver
                    .as_ref()
                    .ok_or_else(|| SourceError::NoContentResolver(uri.clone()))?;
                resolver.open(uri).map_err(|source| SourceError::Open {
                    path: PathBuf::from(uri.as_str()),
                    source,
                })
            }
            ImageSource::Remote(url) => {
                let response = remote::open_remote(url, &self.network)?;
                Ok(Box::new(response))
            }
        }
    }

    /// Open `source` and read it to the end.
    pub fn read_all(&self, source: &ImageSource) -> Result<Vec<u8>, SourceError> {
        let stream = self.open(source)?;
        Ok(remote::read_stream(stream)?)
    }
}

fn open_file(path: &Path) -> Result<Box<dyn Read + Send>, SourceError> {
    File::open(path)
        .map(|f| Box::new(f) as Box<dyn Read + Send>)
        .map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })
}
