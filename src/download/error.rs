//! Error types for the download module.
//!
//! This module defines structured errors for a single download attempt,
//! providing context-rich messages for logging. None of these cross a task
//! boundary; they only drive the retry decision.

use std::path::PathBuf;

use thiserror::Error;

use crate::resolver::ResolveError;

/// Errors that can occur during one attempt to resolve and download an item.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The server did not announce a payload length.
    #[error("no content length announced for {url}")]
    MissingContentLength {
        /// The URL whose response lacked a length.
        url: String,
    },

    /// The stream delivered a different number of bytes than announced.
    #[error("length mismatch for {url}: expected {expected_bytes} bytes, got {actual_bytes}")]
    LengthMismatch {
        /// The streamed URL.
        url: String,
        /// Announced size in bytes.
        expected_bytes: u64,
        /// Bytes actually received (may stop counting once past the announced size).
        actual_bytes: u64,
    },

    /// Link resolution failed before any byte was streamed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Maps a reqwest error to [`Self::Timeout`] or [`Self::Network`].
    pub fn from_request(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a missing content length error.
    pub fn missing_content_length(url: impl Into<String>) -> Self {
        Self::MissingContentLength { url: url.into() }
    }

    /// Creates a length mismatch error.
    pub fn length_mismatch(url: impl Into<String>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::LengthMismatch {
            url: url.into(),
            expected_bytes,
            actual_bytes,
        }
    }
}

// We intentionally do NOT implement `From<reqwest::Error>` or `From<std::io::Error>`:
// the variants need context (url, path) the source errors don't carry.
