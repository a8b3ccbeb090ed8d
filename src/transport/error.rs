//! Transport-level errors: the request produced no HTTP response.

use thiserror::Error;

/// Errors raised before an HTTP response is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level failure (DNS, connection refused, TLS, reset).
    #[error("network error calling {url}: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("timeout calling {url}")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl TransportError {
    /// Classifies a reqwest error for `url`.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Returns true for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// No `From<reqwest::Error>`: every variant needs the request URL for context.
