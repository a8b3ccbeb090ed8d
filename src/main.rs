//! CLI entry point for the cluster resize tool.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use atlas_resize_core::{
    AuditSink, Database, ErrorKind, LogAuditSink, ReqwestTransport, SqliteAuditSink, TriggerEvent,
    resize_cluster,
};
use clap::Parser;
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

/// Exit status for a fatal (configuration) failure.
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let mut settings = args.settings();
    if let Some(path) = &args.event {
        match TriggerEvent::from_path(path) {
            Ok(event) => settings = settings.with_event(event),
            Err(err) => {
                error!(error = %err, kind = %err.kind(), "invalid trigger event");
                return Ok(exit_code(Some(err.kind())));
            }
        }
    }

    let transport = Arc::new(ReqwestTransport::new()?);
    let audit = open_audit_sink(&args).await;

    let outcome = match resize_cluster(settings, transport, audit).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, kind = %err.kind(), "configuration error");
            return Ok(exit_code(Some(err.kind())));
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.success {
        info!(cluster = %outcome.cluster_name, "done");
    }
    Ok(exit_code(outcome.error_kind))
}

/// 0 on success, 2 for fatal failures, 1 for operational failures.
fn exit_code(failure: Option<ErrorKind>) -> ExitCode {
    match failure {
        None => ExitCode::SUCCESS,
        Some(kind) if kind.is_fatal() => ExitCode::from(EXIT_FATAL),
        Some(_) => ExitCode::FAILURE,
    }
}

/// SQLite sink when `--audit-db` is given and opens, log sink otherwise.
async fn open_audit_sink(args: &Args) -> Arc<dyn AuditSink> {
    let Some(path) = &args.audit_db else {
        return Arc::new(LogAuditSink);
    };
    match Database::new(path).await {
        Ok(db) => {
            debug!(path = %path.display(), "audit database opened");
            Arc::new(SqliteAuditSink::new(db))
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "audit database unavailable, logging audit records instead");
            Arc::new(LogAuditSink)
        }
    }
}
