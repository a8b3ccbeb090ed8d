//! Atlas cluster resize core library.
//!
//! Resizes a cluster on the Atlas cluster administration API in two
//! authenticated phases: read the current topology, then submit the same
//! topology with a new electable instance size.
//!
//! # Architecture
//!
//! - [`digest`] - HTTP Digest challenge parsing, signing and the probe/retry step
//! - [`transport`] - request/response types and the reqwest-backed transport
//! - [`cluster`] - topology model, delta computation and the resize state machine
//! - [`config`] - settings resolution and validation
//! - [`audit`] - best-effort operation records
//! - [`db`] - SQLite storage for the audit trail
//! - [`failure`] - closed failure classification

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod audit;
pub mod cluster;
pub mod config;
pub mod db;
pub mod digest;
pub mod failure;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use audit::{AuditError, AuditSink, LogAuditSink, OperationRecord, SqliteAuditSink};
pub use cluster::{
    ClusterDescription, ResizeError, ResizeOrchestrator, ResizeOutcome, ResizeState,
    resize_cluster,
};
pub use config::{ConfigError, ResizeConfig, ResizeSettings, TriggerEvent};
pub use db::{Database, DbError};
pub use digest::{AuthChallenge, Credentials, DigestError, DigestSigner, DigestStep};
pub use failure::ErrorKind;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportError};
