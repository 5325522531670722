//! Error types for catalog requests.
//!
//! Every variant carries the URL or path it concerns so the single terminal
//! message a failed run prints is enough to locate the problem.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the catalog or image servers.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Connection-level failure (DNS, refused connection, TLS, broken body stream).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL being requested.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success status code.
    #[error("HTTP {status} requesting {url}{}", detail_suffix(.detail.as_deref()))]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// First error detail from the catalog's error envelope, if any.
        detail: Option<String>,
    },

    /// The catalog kept answering 429 after every permitted retry.
    #[error("rate limited requesting {url}; gave up after {retries} retries")]
    RateLimitExhausted {
        /// The URL being requested.
        url: String,
        /// Number of additional attempts made after the first 429.
        retries: u32,
    },

    /// The response body was not the expected record.
    #[error("malformed response from {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The envelope decoded but reported something other than `ok`.
    #[error("catalog returned result '{result}' for {url}{}", detail_suffix(.detail.as_deref()))]
    Api {
        /// The URL being requested.
        url: String,
        /// The envelope `result` value.
        result: String,
        /// First error detail, if any.
        detail: Option<String>,
    },

    /// A request target could not be turned into a URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected target.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Local filesystem failure while storing downloaded pages.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

fn detail_suffix(detail: Option<&str>) -> String {
    detail.map(|d| format!(": {d}")).unwrap_or_default()
}

impl CatalogError {
    /// Creates a network error, promoting reqwest timeouts to [`CatalogError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, detail: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            detail,
        }
    }

    /// Creates a rate-limit exhaustion error.
    pub fn rate_limit_exhausted(url: impl Into<String>, retries: u32) -> Self {
        Self::RateLimitExhausted {
            url: url.into(),
            retries,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an error for a non-`ok` envelope.
    pub fn api(url: impl Into<String>, result: impl Into<String>, detail: Option<String>) -> Self {
        Self::Api {
            url: url.into(),
            result: result.into(),
            detail,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the HTTP status for [`CatalogError::HttpStatus`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_includes_detail() {
        let error = CatalogError::http_status(
            "https://api.mangadex.org/chapter/x",
            404,
            Some("Chapter not found".to_string()),
        );
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected status in: {msg}");
        assert!(msg.contains("/chapter/x"), "Expected URL in: {msg}");
        assert!(msg.ends_with(": Chapter not found"), "Expected detail in: {msg}");
    }

    #[test]
    fn test_http_status_display_without_detail() {
        let error = CatalogError::http_status("https://api.mangadex.org/chapter", 500, None);
        assert_eq!(
            error.to_string(),
            "HTTP 500 requesting https://api.mangadex.org/chapter"
        );
        assert_eq!(error.status(), Some(500));
    }

    #[test]
    fn test_rate_limit_exhausted_display() {
        let error = CatalogError::rate_limit_exhausted("https://api.mangadex.org/chapter", 3);
        let msg = error.to_string();
        assert!(msg.contains("rate limited"), "Expected 'rate limited' in: {msg}");
        assert!(msg.contains("3 retries"), "Expected retry count in: {msg}");
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_decode_display() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = CatalogError::decode("https://api.mangadex.org/chapter", source);
        assert!(error.to_string().starts_with("malformed response from"));
    }

    #[test]
    fn test_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = CatalogError::io("/tmp/mangadex123/001_a.jpg", io_error);
        assert!(error.to_string().contains("/tmp/mangadex123/001_a.jpg"));
    }
}
