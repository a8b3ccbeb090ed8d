//! Audit sink port and its SQLite and log-backed implementations.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::AUDIT_TARGET;
use super::record::OperationRecord;
use crate::db::Database;
use crate::failure::ErrorKind;

/// Errors from an audit sink. Always swallowed by the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    /// The backing database rejected the write.
    #[error("audit database error: {0}")]
    Database(String),

    /// The sink could not be reached.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

impl AuditError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Destination for [`OperationRecord`]s.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Stores one record.
    async fn record(&self, entry: &OperationRecord) -> Result<(), AuditError>;
}

/// Inserts records into the `cluster_operations` table.
#[derive(Debug, Clone)]
pub struct SqliteAuditSink {
    db: Database,
}

impl SqliteAuditSink {
    /// Creates a sink writing to `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    #[instrument(skip(self, entry), fields(cluster = %entry.cluster_name, status = %entry.status))]
    async fn record(&self, entry: &OperationRecord) -> Result<(), AuditError> {
        let result = sqlx::query(
            r"INSERT INTO cluster_operations
              (timestamp_ms, operation, cluster_name, from_size, to_size, status, error, error_kind, triggered_by)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.timestamp_ms)
        .bind(&entry.operation)
        .bind(&entry.cluster_name)
        .bind(entry.from_size.as_deref())
        .bind(entry.to_size.as_deref())
        .bind(&entry.status)
        .bind(entry.error.as_deref())
        .bind(entry.error_kind.map(ErrorKind::label))
        .bind(&entry.triggered_by)
        .execute(self.db.pool())
        .await?;

        debug!(id = result.last_insert_rowid(), "audit record stored");
        Ok(())
    }
}

/// Emits records as structured log events on the audit target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, entry: &OperationRecord) -> Result<(), AuditError> {
        info!(
            target: AUDIT_TARGET,
            timestamp_ms = entry.timestamp_ms,
            operation = %entry.operation,
            cluster = %entry.cluster_name,
            from_size = ?entry.from_size,
            to_size = ?entry.to_size,
            status = %entry.status,
            error = ?entry.error,
            error_kind = ?entry.error_kind,
            triggered_by = %entry.triggered_by,
            "cluster operation"
        );
        Ok(())
    }
}
