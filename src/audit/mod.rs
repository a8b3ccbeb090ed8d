//! Best-effort audit trail of resize operations.
//!
//! One [`OperationRecord`] is written per invocation, on both the success and
//! the failure path. Sink failures never change the invocation result:
//! [`record_best_effort`] swallows them and reports them on the
//! `atlas_resize::audit` tracing target instead.

mod record;
mod sink;

pub use record::{OPERATION_RESIZE, OperationRecord, STATUS_FAILED};
pub use sink::{AuditError, AuditSink, LogAuditSink, SqliteAuditSink};

use tracing::warn;

/// Tracing target for audit diagnostics.
pub const AUDIT_TARGET: &str = "atlas_resize::audit";

/// Writes `entry` to `sink`, logging instead of propagating any failure.
///
/// Returns whether the record was stored.
pub async fn record_best_effort(sink: &dyn AuditSink, entry: &OperationRecord) -> bool {
    match sink.record(entry).await {
        Ok(()) => true,
        Err(error) => {
            warn!(
                target: AUDIT_TARGET,
                cluster = %entry.cluster_name,
                status = %entry.status,
                error = %error,
                "audit record not stored (non-critical)"
            );
            false
        }
    }
}
