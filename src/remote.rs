//! Remote image I/O over HTTP(S).
//!
//! Two entry points with different redirect handling:
//!
//! - [`open_remote`] follows `301`/`302`/`303` by hand, up to
//!   `network.max_redirects` hops, and hands back the response as a stream.
//! - [`download_bytes`] lets the client follow redirects and only accepts a
//!   final `200 OK`.

use crate::config::NetworkConfig;
use crate::source::SourceError;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use std::io::{self, Read};
use tracing::{debug, warn};
use url::Url;

fn client(network: &NetworkConfig, policy: Policy) -> Result<Client, SourceError> {
    Ok(Client::builder()
        .redirect(policy)
        .connect_timeout(network.connect_timeout())
        .user_agent(network.user_agent.as_str())
        .build()?)
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
    )
}

/// Open `url` for streaming, following at most `max_redirects` redirects.
///
/// Relative `Location` headers are resolved against the URL that sent them.
pub fn open_remote(url: &Url, network: &NetworkConfig) -> Result<Response, SourceError> {
    let client = client(network, Policy::none())?;
    let mut current = url.clone();
    let mut hops = 0;

    loop {
        let response = client.get(current.clone()).send()?;
        let status = response.status();

        if is_followed_redirect(status) {
            if hops >= network.max_redirects {
                warn!(url = %url, limit = network.max_redirects, "too many redirects");
                return Err(SourceError::TooManyRedirects {
                    url: url.clone(),
                    limit: network.max_redirects,
                });
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| SourceError::MissingLocation {
                    url: current.clone(),
                })?;
            let next = current
                .join(location)
                .map_err(|e| SourceError::InvalidUri {
                    uri: location.to_string(),
                    reason: e.to_string(),
                })?;
            debug!(from = %current, to = %next, status = status.as_u16(), "following redirect");
            current = next;
            hops += 1;
            continue;
        }

        if !status.is_success() {
            return Err(SourceError::Status {
                url: current,
                status: status.as_u16(),
            });
        }
        return Ok(response);
    }
}

/// Download the body at `url`. Anything but a final `200 OK` is an error.
pub fn download_bytes(url: &Url, network: &NetworkConfig) -> Result<Vec<u8>, SourceError> {
    let client = client(
        network,
        Policy::limited(network.max_redirects as usize),
    )?;
    let response = client.get(url.clone()).send()?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(SourceError::Status {
            url: url.clone(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes()?;
    debug!(url = %url, bytes = bytes.len(), "downloaded");
    Ok(bytes.to_vec())
}

/// Drain a stream into memory. The stream is dropped (closed) afterwards.
pub fn read_stream(mut stream: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn url(server: &MockServer, path: &str) -> Url {
        Url::parse(&server.url(path)).unwrap()
    }

    #[test]
    fn open_remote_streams_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/a.jpg");
            then.status(200).body("jpeg-bytes");
        });

        let response = open_remote(&url(&server, "/a.jpg"), &NetworkConfig::default()).unwrap();
        let body = read_stream(response).unwrap();

        mock.assert();
        assert_eq!(body, b"jpeg-bytes");
    }

    #[test]
    fn open_remote_follows_one_redirect() {
        let server = MockServer::start();
        let redirect = server.mock(|when, then| {
            when.method(GET).path("/old.jpg");
            then.status(302).header("Location", "/new.jpg");
        });
        let target = server.mock(|when, then| {
            when.method(GET).path("/new.jpg");
            then.status(200).body("moved");
        });

        let response = open_remote(&url(&server, "/old.jpg"), &NetworkConfig::default()).unwrap();

        redirect.assert();
        target.assert();
        assert_eq!(read_stream(response).unwrap(), b"moved");
    }

    #[test]
    fn open_remote_stops_after_redirect_limit() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/a");
            then.status(301).header("Location", "/b");
        });
        server.mock(|when, then| {
            when.method(GET).path("/b");
            then.status(303).header("Location", "/c");
        });

        let err = open_remote(&url(&server, "/a"), &NetworkConfig::default()).unwrap_err();
        assert!(matches!(err, SourceError::TooManyRedirects { limit: 1, .. }));
    }

    #[test]
    fn open_remote_redirect_without_location() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/a");
            then.status(302);
        });

        let err = open_remote(&url(&server, "/a"), &NetworkConfig::default()).unwrap_err();
        assert!(matches!(err, SourceError::MissingLocation { .. }));
    }

    #[test]
    fn open_remote_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.jpg");
            then.status(404);
        });

        let err = open_remote(&url(&server, "/missing.jpg"), &NetworkConfig::default()).unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }

    #[test]
    fn download_requires_ok() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/empty");
            then.status(204);
        });

        let err = download_bytes(&url(&server, "/empty"), &NetworkConfig::default()).unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 204, .. }));
    }

    #[test]
    fn download_returns_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/avatar.png").header("user-agent", "photokit");
            then.status(200).body([1u8, 2, 3]);
        });

        let bytes = download_bytes(&url(&server, "/avatar.png"), &NetworkConfig::default()).unwrap();
        mock.assert();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn read_stream_drains_reader() {
        let data = io::Cursor::new(vec![7u8; 5000]);
        assert_eq!(read_stream(data).unwrap().len(), 5000);
    }
}
