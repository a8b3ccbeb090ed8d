//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;

use atlas_resize_core::ResizeSettings;
use clap::Parser;

/// Resize an Atlas cluster's electable instance size.
///
/// Reads the cluster's current topology, then submits the same topology with
/// the target instance size. Both requests use HTTP Digest authentication
/// with the programmatic API key pair.
#[derive(Parser)]
#[command(name = "atlas-resize")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// API public key (digest username)
    #[arg(long, env = "ATLAS_PUBLIC_KEY")]
    pub public_key: Option<String>,

    /// API private key (digest password)
    #[arg(long, env = "ATLAS_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Project (group) identifier
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: Option<String>,

    /// Cluster to resize
    #[arg(long, env = "CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// Target electable instance size [default: M40]
    #[arg(short = 't', long, env = "TARGET_INSTANCE_SIZE")]
    pub target_size: Option<String>,

    /// Cluster API base URL [default: https://cloud.mongodb.com/api/atlas/v2]
    #[arg(long, env = "ATLAS_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Trigger event JSON file ({"targetInstanceSize"?, "operationType"?})
    #[arg(short, long)]
    pub event: Option<PathBuf>,

    /// What fired this invocation, recorded in the audit trail [default: manual]
    #[arg(long)]
    pub triggered_by: Option<String>,

    /// SQLite audit database; audit records are logged when omitted
    #[arg(long, env = "ATLAS_RESIZE_AUDIT_DB")]
    pub audit_db: Option<PathBuf>,
}

impl Args {
    /// Raw settings for validation by the library.
    #[must_use]
    pub fn settings(&self) -> ResizeSettings {
        ResizeSettings {
            public_key: self.public_key.clone(),
            private_key: self.private_key.clone(),
            project_id: self.project_id.clone(),
            cluster_name: self.cluster_name.clone(),
            target_instance_size: self.target_size.clone(),
            api_base_url: self.api_base_url.clone(),
            triggered_by: self.triggered_by.clone(),
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .field("public_key", &self.public_key.as_ref().map(|_| "<set>"))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("cluster_name", &self.cluster_name)
            .field("target_size", &self.target_size)
            .field("api_base_url", &self.api_base_url)
            .field("event", &self.event)
            .field("triggered_by", &self.triggered_by)
            .field("audit_db", &self.audit_db)
            .finish()
    }
}
