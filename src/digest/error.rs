//! Error types for the digest authentication module.

use thiserror::Error;

use crate::transport::TransportError;

/// Reasons a `WWW-Authenticate` value cannot be used as a digest challenge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    /// The 401 response carried no `WWW-Authenticate` header.
    #[error("server did not send a WWW-Authenticate header")]
    MissingHeader,

    /// The header does not advertise the digest scheme.
    #[error("server does not support digest authentication (challenge: {header})")]
    NotDigest {
        /// The offending header value.
        header: String,
    },

    /// A quoted parameter value is missing its closing quote.
    #[error("unterminated quoted value for challenge parameter `{key}`")]
    UnterminatedQuote {
        /// Parameter whose value was cut short.
        key: String,
    },

    /// A parameter the digest computation needs is absent.
    #[error("digest challenge is missing `{0}`")]
    MissingParameter(&'static str),

    /// Echoing the challenge back would produce an invalid header value.
    #[error("digest response contains characters not allowed in an HTTP header")]
    UnencodableResponse,
}

impl ChallengeError {
    /// Creates a not-digest error.
    pub fn not_digest(header: impl Into<String>) -> Self {
        Self::NotDigest {
            header: header.into(),
        }
    }

    /// Creates an unterminated-quote error.
    pub fn unterminated_quote(key: impl Into<String>) -> Self {
        Self::UnterminatedQuote { key: key.into() }
    }
}

/// Errors from one digest-authenticated HTTP exchange.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The unauthenticated probe did not return 401.
    #[error("Expected 401 challenge for {method}, got {status}")]
    ChallengeExpected {
        /// HTTP method of the probe.
        method: String,
        /// Status the server returned instead.
        status: u16,
    },

    /// The 401 response carried a challenge that could not be used.
    #[error("malformed digest challenge for {method}: {source}")]
    MalformedChallenge {
        /// HTTP method of the probe.
        method: String,
        /// Why the challenge was rejected.
        #[source]
        source: ChallengeError,
    },

    /// The server answered with a status outside the digest contract.
    #[error("{method} {url} returned HTTP {status}")]
    UnexpectedStatus {
        /// HTTP method of the failing request.
        method: String,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, when the server sent one.
        body: Option<String>,
    },

    /// The request never produced an HTTP response.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DigestError {
    /// Creates a challenge-expected error.
    pub fn challenge_expected(method: impl Into<String>, status: u16) -> Self {
        Self::ChallengeExpected {
            method: method.into(),
            status,
        }
    }

    /// Creates a malformed-challenge error.
    pub fn malformed_challenge(method: impl Into<String>, source: ChallengeError) -> Self {
        Self::MalformedChallenge {
            method: method.into(),
            source,
        }
    }

    /// Creates an unexpected-status error; an empty body is recorded as absent.
    pub fn unexpected_status(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        body: &str,
    ) -> Self {
        Self::UnexpectedStatus {
            method: method.into(),
            url: url.into(),
            status,
            body: (!body.trim().is_empty()).then(|| body.to_string()),
        }
    }

    /// Returns the response body attached to this error, if any.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::UnexpectedStatus { body, .. } => body.as_deref(),
            Self::ChallengeExpected { .. }
            | Self::MalformedChallenge { .. }
            | Self::Transport(_) => None,
        }
    }
}
