//! SQLite store for the cluster operations audit trail.
//!
//! The file is opened in WAL mode so the trail can be read while an
//! invocation appends to it. Migrations under `migrations/` are embedded and
//! applied on open.
//!
//! ```no_run
//! use atlas_resize_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("cluster_operations.db")).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// One invocation writes one row; a small pool is plenty.
const MAX_CONNECTIONS: u32 = 2;

/// How long a writer waits on a locked file before failing with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Audit store errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Opening or querying the database failed.
    #[error("audit database error: {0}")]
    Connection(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("audit database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pooled handle to the audit database. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `db_path` and migrates it.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the file cannot be opened and
    /// `DbError::Migration` if the schema cannot be applied.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    /// In-memory database with the full schema, for tests.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the connection or migration fails.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
        // Each connection to :memory: is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("audit schema up to date");
        Ok(Self { pool })
    }

    /// Underlying pool, for queries.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current journal mode, lowercased (`wal` for file databases).
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the pragma query fails.
    pub async fn journal_mode(&self) -> Result<String, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;
        Ok(mode.to_lowercase())
    }

    /// Closes every pooled connection, including those held by clones.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}
