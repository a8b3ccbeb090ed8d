//! Operational errors of the resize workflow.

use thiserror::Error;

use crate::digest::DigestError;
use crate::failure::ErrorKind;
use crate::transport::TransportError;

/// Errors that move the orchestrator to `Failed`.
#[derive(Debug, Error)]
pub enum ResizeError {
    /// An authenticated exchange failed.
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// The observed cluster has nothing to resize.
    #[error("cluster {cluster} has no replication specs or region configs to resize")]
    NoTopologyFound {
        /// Cluster name.
        cluster: String,
    },

    /// A payload did not match the expected schema.
    #[error("invalid {context} payload: {source}")]
    InvalidPayload {
        /// Which payload failed (`cluster description`, `resize request`, ...).
        context: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
        /// Raw body when the payload was a response.
        body: Option<String>,
    },
}

impl ResizeError {
    /// Creates a no-topology error.
    pub fn no_topology(cluster: impl Into<String>) -> Self {
        Self::NoTopologyFound {
            cluster: cluster.into(),
        }
    }

    /// Creates an invalid-payload error for a response body.
    pub fn invalid_response(context: &'static str, source: serde_json::Error, body: &str) -> Self {
        Self::InvalidPayload {
            context,
            source,
            body: Some(body.to_string()),
        }
    }

    /// Creates an invalid-payload error for a request body.
    pub fn invalid_request(context: &'static str, source: serde_json::Error) -> Self {
        Self::InvalidPayload {
            context,
            source,
            body: None,
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Digest(DigestError::ChallengeExpected { .. }) => ErrorKind::ChallengeExpected,
            Self::Digest(DigestError::MalformedChallenge { .. }) => ErrorKind::MalformedChallenge,
            Self::Digest(DigestError::UnexpectedStatus { .. }) => ErrorKind::UnexpectedStatus,
            Self::Digest(DigestError::Transport(TransportError::Timeout { .. })) => {
                ErrorKind::Timeout
            }
            Self::Digest(DigestError::Transport(_)) => ErrorKind::Network,
            Self::NoTopologyFound { .. } => ErrorKind::NoTopologyFound,
            Self::InvalidPayload { .. } => ErrorKind::InvalidPayload,
        }
    }

    /// Response body attached to the failure, if the server sent one.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Digest(error) => error.response_body(),
            Self::InvalidPayload { body, .. } => body.as_deref(),
            Self::NoTopologyFound { .. } => None,
        }
    }

    /// Whether an invoking system could reasonably re-run the operation.
    ///
    /// True for network failures, timeouts and 5xx / 429 responses.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Digest(DigestError::Transport(_)) => true,
            Self::Digest(DigestError::UnexpectedStatus { status, .. }) => {
                *status == 429 || (500..600).contains(status)
            }
            _ => false,
        }
    }
}
