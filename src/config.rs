//! Invocation configuration.
//!
//! [`ResizeSettings`] holds raw, possibly incomplete inputs as supplied by the
//! trigger host (flags, environment, event payload). [`ResizeConfig`] is the
//! validated form the orchestrator is built from; constructing it is the only
//! place configuration can fail, and it happens before any network call.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::digest::Credentials;
use crate::failure::ErrorKind;

/// Target size used when neither settings nor the trigger event name one.
pub const DEFAULT_TARGET_INSTANCE_SIZE: &str = "M40";

/// Versioned admin API root.
pub const DEFAULT_API_BASE_URL: &str = "https://cloud.mongodb.com/api/atlas/v2";

/// `triggeredBy` value recorded when no trigger event names an operation.
pub const DEFAULT_TRIGGERED_BY: &str = "manual";

/// Configuration errors. Always fatal; never audited.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required values are missing or blank.
    #[error(
        "missing required configuration: {}. Set ATLAS_PUBLIC_KEY, ATLAS_PRIVATE_KEY, PROJECT_ID and CLUSTER_NAME",
        .fields.join(", ")
    )]
    Missing {
        /// Names of every missing value.
        fields: Vec<&'static str>,
    },

    /// A value is present but unusable.
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidValue {
        /// Setting name.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The trigger event file could not be read.
    #[error("failed to read trigger event {path}: {source}")]
    EventRead {
        /// Event file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The trigger event file is not valid JSON of the expected shape.
    #[error("invalid trigger event {path}: {source}")]
    EventParse {
        /// Event file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Always [`ErrorKind::Configuration`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Event payload that triggered the invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    /// Requested instance size.
    #[serde(default)]
    pub target_instance_size: Option<String>,
    /// Operation that fired the trigger (`insert`, `update`, ...).
    #[serde(default)]
    pub operation_type: Option<String>,
}

impl TriggerEvent {
    /// Reads an event from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EventRead`] or [`ConfigError::EventParse`].
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::EventRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::EventParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Raw configuration inputs, any of which may be missing.
#[derive(Clone, Default)]
pub struct ResizeSettings {
    /// API public key (digest username).
    pub public_key: Option<String>,
    /// API private key (digest password).
    pub private_key: Option<String>,
    /// Project (group) identifier.
    pub project_id: Option<String>,
    /// Cluster name.
    pub cluster_name: Option<String>,
    /// Requested instance size.
    pub target_instance_size: Option<String>,
    /// API root, for non-default deployments and tests.
    pub api_base_url: Option<String>,
    /// What fired this invocation.
    pub triggered_by: Option<String>,
}

impl std::fmt::Debug for ResizeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeSettings")
            .field("public_key", &self.public_key.as_ref().map(|_| "[SET]"))
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("project_id", &self.project_id)
            .field("cluster_name", &self.cluster_name)
            .field("target_instance_size", &self.target_instance_size)
            .field("api_base_url", &self.api_base_url)
            .field("triggered_by", &self.triggered_by)
            .finish()
    }
}

impl ResizeSettings {
    /// Fills target size and trigger source from `event` where settings are silent.
    #[must_use]
    pub fn with_event(mut self, event: TriggerEvent) -> Self {
        if non_blank(self.target_instance_size.as_deref()).is_none() {
            self.target_instance_size = event.target_instance_size;
        }
        if non_blank(self.triggered_by.as_deref()).is_none() {
            self.triggered_by = event.operation_type;
        }
        self
    }
}

/// Validated configuration for one invocation.
#[derive(Debug, Clone)]
pub struct ResizeConfig {
    credentials: Credentials,
    project_id: String,
    cluster_name: String,
    target_instance_size: String,
    triggered_by: String,
    resource_url: Url,
}

impl ResizeConfig {
    /// Validates `settings`.
    ///
    /// All missing required values are reported together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the public key, private key,
    /// project id, or cluster name is absent or blank, and
    /// [`ConfigError::InvalidValue`] for an unusable base URL or instance size.
    pub fn from_settings(settings: ResizeSettings) -> Result<Self, ConfigError> {
        let public_key = non_blank(settings.public_key.as_deref());
        let private_key = non_blank(settings.private_key.as_deref());
        let project_id = non_blank(settings.project_id.as_deref());
        let cluster_name = non_blank(settings.cluster_name.as_deref());

        let (Some(public_key), Some(private_key), Some(project_id), Some(cluster_name)) =
            (public_key, private_key, project_id, cluster_name)
        else {
            let fields = [
                ("ATLAS_PUBLIC_KEY", public_key),
                ("ATLAS_PRIVATE_KEY", private_key),
                ("PROJECT_ID", project_id),
                ("CLUSTER_NAME", cluster_name),
            ]
            .into_iter()
            .filter_map(|(name, value)| value.is_none().then_some(name))
            .collect();
            return Err(ConfigError::Missing { fields });
        };

        let target_instance_size = non_blank(settings.target_instance_size.as_deref())
            .unwrap_or(DEFAULT_TARGET_INSTANCE_SIZE);
        validate_instance_size(target_instance_size)?;

        let base_url = non_blank(settings.api_base_url.as_deref()).unwrap_or(DEFAULT_API_BASE_URL);
        let resource_url = cluster_resource_url(base_url, project_id, cluster_name)?;

        let triggered_by =
            non_blank(settings.triggered_by.as_deref()).unwrap_or(DEFAULT_TRIGGERED_BY);

        debug!(
            project_id,
            cluster_name,
            target_instance_size,
            triggered_by,
            resource_url = %resource_url,
            "configuration validated"
        );

        Ok(Self {
            credentials: Credentials::new(public_key, private_key),
            project_id: project_id.to_string(),
            cluster_name: cluster_name.to_string(),
            target_instance_size: target_instance_size.to_string(),
            triggered_by: triggered_by.to_string(),
            resource_url,
        })
    }

    /// Digest credentials.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Project identifier.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Cluster name.
    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Size every node group is moved to.
    #[must_use]
    pub fn target_instance_size(&self) -> &str {
        &self.target_instance_size
    }

    /// Trigger source recorded in the audit trail.
    #[must_use]
    pub fn triggered_by(&self) -> &str {
        &self.triggered_by
    }

    /// `<base>/groups/<project>/clusters/<cluster>`.
    #[must_use]
    pub fn resource_url(&self) -> &Url {
        &self.resource_url
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn validate_instance_size(size: &str) -> Result<(), ConfigError> {
    if size.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: "TARGET_INSTANCE_SIZE",
            value: size.to_string(),
            reason: "expected letters, digits and underscores (for example M40 or R50_NVME)",
        })
    }
}

fn cluster_resource_url(
    base_url: &str,
    project_id: &str,
    cluster_name: &str,
) -> Result<Url, ConfigError> {
    let invalid = |reason| ConfigError::InvalidValue {
        field: "ATLAS_API_BASE_URL",
        value: base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(base_url).map_err(|_| invalid("not an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot carry a path"))?
        .pop_if_empty()
        .extend(["groups", project_id, "clusters", cluster_name]);
    Ok(url)
}
