//! Error types for the resolver module.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors raised while resolving a series or an item's download sources.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The underlying request failed.
    #[error("resolver request failed: {source}")]
    Http {
        /// The request error.
        #[source]
        source: Box<DownloadError>,
    },

    /// The response did not have the expected shape.
    #[error("malformed response from {url}: {reason}")]
    Malformed {
        /// The URL that returned the response.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The series lists no server to take items from.
    #[error("no servers listed for {url}")]
    NoServers {
        /// The series locator.
        url: String,
    },

    /// The item offers no downloadable source.
    #[error("no download sources offered for item {item}")]
    NoSources {
        /// The item identifier.
        item: String,
    },
}

impl ResolveError {
    /// Wraps a request error.
    #[must_use]
    pub fn http(source: DownloadError) -> Self {
        Self::Http {
            source: Box::new(source),
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a no-servers error.
    pub fn no_servers(url: impl Into<String>) -> Self {
        Self::NoServers { url: url.into() }
    }

    /// Creates a no-sources error.
    pub fn no_sources(item: impl Into<String>) -> Self {
        Self::NoSources { item: item.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_http_keeps_source_message() {
        let error = ResolveError::http(DownloadError::http_status("https://x/info", 502));
        let msg = error.to_string();
        assert!(msg.contains("502"), "Expected status in: {msg}");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_resolve_error_malformed_display() {
        let error = ResolveError::malformed("https://x/grab", "missing field `data`");
        assert_eq!(
            error.to_string(),
            "malformed response from https://x/grab: missing field `data`"
        );
    }

    #[test]
    fn test_resolve_error_no_sources_display() {
        assert!(ResolveError::no_sources("ep-3").to_string().contains("ep-3"));
    }
}
