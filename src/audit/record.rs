//! One audit entry per resize invocation.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::failure::ErrorKind;

/// `operation` value for resize records.
pub const OPERATION_RESIZE: &str = "resize";

/// `status` value for failed operations.
pub const STATUS_FAILED: &str = "failed";

/// Status recorded when the API accepted the change but reported no state.
const STATUS_UNKNOWN: &str = "UNKNOWN";

/// Append-only audit entry, written once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    /// Operation name.
    pub operation: String,
    /// Cluster the operation targeted.
    pub cluster_name: String,
    /// Instance size before the operation, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_size: Option<String>,
    /// Requested instance size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_size: Option<String>,
    /// Remote state name on success, `failed` otherwise.
    pub status: String,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// What fired the invocation.
    pub triggered_by: String,
}

impl OperationRecord {
    /// Record for an accepted resize.
    #[must_use]
    pub fn succeeded(
        cluster_name: &str,
        from_size: Option<&str>,
        to_size: &str,
        state_name: Option<&str>,
        triggered_by: &str,
    ) -> Self {
        Self {
            timestamp_ms: now_ms(),
            operation: OPERATION_RESIZE.to_string(),
            cluster_name: cluster_name.to_string(),
            from_size: from_size.map(str::to_string),
            to_size: Some(to_size.to_string()),
            status: state_name.unwrap_or(STATUS_UNKNOWN).to_string(),
            error: None,
            error_kind: None,
            triggered_by: triggered_by.to_string(),
        }
    }

    /// Record for a resize that ended in `Failed`.
    #[must_use]
    pub fn failed(
        cluster_name: &str,
        from_size: Option<&str>,
        to_size: &str,
        error: &str,
        kind: ErrorKind,
        triggered_by: &str,
    ) -> Self {
        Self {
            timestamp_ms: now_ms(),
            operation: OPERATION_RESIZE.to_string(),
            cluster_name: cluster_name.to_string(),
            from_size: from_size.map(str::to_string),
            to_size: Some(to_size.to_string()),
            status: STATUS_FAILED.to_string(),
            error: Some(error.to_string()),
            error_kind: Some(kind),
            triggered_by: triggered_by.to_string(),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
