//! Closed classification of resize failures.
//!
//! Every error that can end an invocation maps to exactly one [`ErrorKind`].
//! Callers use it to tell a fatal configuration problem apart from an
//! operational failure, and to decide whether re-running may help.

use std::fmt;

use serde::Serialize;

/// Kind of failure that ended an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required configuration is missing or invalid. Raised before any
    /// network activity and never audited.
    Configuration,
    /// The endpoint answered an unauthenticated request without a 401.
    ChallengeExpected,
    /// The 401 challenge could not be parsed or answered.
    MalformedChallenge,
    /// The endpoint returned a status outside the digest contract.
    UnexpectedStatus,
    /// The observed cluster has no topology to resize.
    NoTopologyFound,
    /// A response or request body did not match the expected schema.
    InvalidPayload,
    /// Connection-level failure.
    Network,
    /// The request exceeded its timeout.
    Timeout,
}

impl ErrorKind {
    /// Stable snake_case label, suitable for logs and audit records.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::ChallengeExpected => "challenge_expected",
            Self::MalformedChallenge => "malformed_challenge",
            Self::UnexpectedStatus => "unexpected_status",
            Self::NoTopologyFound => "no_topology_found",
            Self::InvalidPayload => "invalid_payload",
            Self::Network => "network",
            Self::Timeout => "timeout",
        }
    }

    /// Whether the failure ended the invocation before any network call.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Configuration)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
