//! The resize state machine.
//!
//! ```text
//! Idle -> FetchingCurrentSpec -> ComputingDelta -> SubmittingPatch -> Completed
//!              |                      |                 |
//!              +----------------------+-----------------+--------> Failed
//! ```
//!
//! The `GET` and the `PATCH` each run their own [`DigestStep`], so each verb
//! is signed against its own freshly issued nonce. Nothing is retried.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::delta::{build_resize_request, current_instance_size};
use super::error::ResizeError;
use super::model::ClusterDescription;
use crate::audit::{AuditSink, OperationRecord, record_best_effort};
use crate::config::{ConfigError, ResizeConfig, ResizeSettings};
use crate::digest::{DigestError, DigestSigner, DigestStep};
use crate::failure::ErrorKind;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Versioned media type of the cluster API.
pub const ATLAS_MEDIA_TYPE: &str = "application/vnd.atlas.2023-02-01+json";

/// Where the orchestrator is in the resize workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeState {
    /// Not started.
    Idle,
    /// Authenticated `GET` of the cluster description in flight.
    FetchingCurrentSpec,
    /// Building the target specification.
    ComputingDelta,
    /// Authenticated `PATCH` in flight.
    SubmittingPatch,
    /// The API accepted the resize.
    Completed,
    /// A step failed; see the outcome for details.
    Failed,
}

impl fmt::Display for ResizeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::FetchingCurrentSpec => "fetching_current_spec",
            Self::ComputingDelta => "computing_delta",
            Self::SubmittingPatch => "submitting_patch",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Structured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeOutcome {
    /// Whether the API accepted the resize.
    pub success: bool,
    /// Summary on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Cluster the invocation targeted.
    pub cluster_name: String,
    /// Electable instance size observed before the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_size: Option<String>,
    /// Requested instance size (success only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_size: Option<String>,
    /// Remote state after the `PATCH` (success only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    /// Server response body attached to the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

/// Drives one resize of one cluster.
pub struct ResizeOrchestrator {
    config: ResizeConfig,
    signer: DigestSigner,
    transport: Arc<dyn HttpTransport>,
    audit: Arc<dyn AuditSink>,
    state: ResizeState,
    previous_size: Option<String>,
}

impl ResizeOrchestrator {
    /// Creates an orchestrator in [`ResizeState::Idle`].
    #[must_use]
    pub fn new(
        config: ResizeConfig,
        transport: Arc<dyn HttpTransport>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let signer = DigestSigner::new(config.credentials().clone());
        Self {
            config,
            signer,
            transport,
            audit,
            state: ResizeState::Idle,
            previous_size: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ResizeState {
        self.state
    }

    /// Runs the workflow to `Completed` or `Failed` and audits the result.
    ///
    /// Never fails: every operational error becomes a failed
    /// [`ResizeOutcome`]. Audit failures are logged and otherwise ignored.
    #[instrument(
        skip(self),
        fields(
            project = %self.config.project_id(),
            cluster = %self.config.cluster_name(),
            target = %self.config.target_instance_size()
        )
    )]
    pub async fn run(&mut self) -> ResizeOutcome {
        self.state = ResizeState::Idle;
        self.previous_size = None;
        info!(url = %self.config.resource_url(), "starting cluster resize");

        match self.execute().await {
            Ok(state_name) => {
                self.transition(ResizeState::Completed);
                info!(
                    previous_size = ?self.previous_size,
                    state_name = ?state_name,
                    "cluster resize initiated"
                );
                let record = OperationRecord::succeeded(
                    self.config.cluster_name(),
                    self.previous_size.as_deref(),
                    self.config.target_instance_size(),
                    state_name.as_deref(),
                    self.config.triggered_by(),
                );
                record_best_effort(self.audit.as_ref(), &record).await;
                self.succeeded(state_name)
            }
            Err(failure) => {
                self.transition(ResizeState::Failed);
                error!(
                    error = %failure,
                    kind = %failure.kind(),
                    retryable = failure.is_retryable(),
                    response_body = ?failure.response_body(),
                    "cluster resize failed"
                );
                let record = OperationRecord::failed(
                    self.config.cluster_name(),
                    self.previous_size.as_deref(),
                    self.config.target_instance_size(),
                    &failure.to_string(),
                    failure.kind(),
                    self.config.triggered_by(),
                );
                record_best_effort(self.audit.as_ref(), &record).await;
                self.failed(&failure)
            }
        }
    }

    /// Returns the remote state name reported by the accepted `PATCH`.
    async fn execute(&mut self) -> Result<Option<String>, ResizeError> {
        self.transition(ResizeState::FetchingCurrentSpec);
        let response = self.authenticated(self.request(Method::GET)).await?;
        let cluster: ClusterDescription = response.json().map_err(|source| {
            ResizeError::invalid_response("cluster description", source, &response.body)
        })?;
        self.previous_size = current_instance_size(&cluster).map(str::to_string);
        info!(previous_size = ?self.previous_size, "current cluster size");

        self.transition(ResizeState::ComputingDelta);
        let body = build_resize_request(
            self.config.cluster_name(),
            &cluster,
            self.config.target_instance_size(),
        )?;
        let request = self
            .request(Method::PATCH)
            .json(&body)
            .map_err(|source| ResizeError::invalid_request("resize request", source))?;

        self.transition(ResizeState::SubmittingPatch);
        let response = self.authenticated(request).await?;
        Ok(accepted_state_name(&response))
    }

    /// One full probe/challenge/retry round trip; never shares a nonce.
    async fn authenticated(&self, request: ApiRequest) -> Result<ApiResponse, DigestError> {
        DigestStep::new(self.transport.as_ref(), &self.signer)
            .execute(request)
            .await
    }

    fn request(&self, method: Method) -> ApiRequest {
        ApiRequest::new(method, self.config.resource_url().clone())
            .header(ACCEPT, HeaderValue::from_static(ATLAS_MEDIA_TYPE))
            .header(CONTENT_TYPE, HeaderValue::from_static(ATLAS_MEDIA_TYPE))
    }

    fn transition(&mut self, next: ResizeState) {
        debug!(from = %self.state, to = %next, "resize state transition");
        self.state = next;
    }

    fn succeeded(&self, state_name: Option<String>) -> ResizeOutcome {
        let reported = state_name.as_deref().unwrap_or("UNKNOWN");
        ResizeOutcome {
            success: true,
            message: Some(format!("Cluster resize initiated: {reported}")),
            error: None,
            error_kind: None,
            cluster_name: self.config.cluster_name().to_string(),
            previous_size: self.previous_size.clone(),
            new_size: Some(self.config.target_instance_size().to_string()),
            state_name,
            response_body: None,
        }
    }

    fn failed(&self, failure: &ResizeError) -> ResizeOutcome {
        ResizeOutcome {
            success: false,
            message: None,
            error: Some(failure.to_string()),
            error_kind: Some(failure.kind()),
            cluster_name: self.config.cluster_name().to_string(),
            previous_size: self.previous_size.clone(),
            new_size: None,
            state_name: None,
            response_body: failure.response_body().map(str::to_string),
        }
    }
}

/// The `PATCH` already went through; an unreadable body only loses the state name.
fn accepted_state_name(response: &ApiResponse) -> Option<String> {
    match response.json::<ClusterDescription>() {
        Ok(cluster) => cluster.state_name,
        Err(error) => {
            warn!(error = %error, "resize accepted but response body was not a cluster description");
            None
        }
    }
}

/// Validates `settings` and runs one resize.
///
/// # Errors
///
/// Returns [`ConfigError`] when configuration is incomplete or invalid; no
/// request is sent and nothing is audited in that case. Operational failures
/// are reported through the returned [`ResizeOutcome`].
pub async fn resize_cluster(
    settings: ResizeSettings,
    transport: Arc<dyn HttpTransport>,
    audit: Arc<dyn AuditSink>,
) -> Result<ResizeOutcome, ConfigError> {
    let config = ResizeConfig::from_settings(settings)?;
    let mut orchestrator = ResizeOrchestrator::new(config, transport, audit);
    Ok(orchestrator.run().await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};

    use super::*;
    use crate::audit::AuditError;
    use crate::transport::TransportError;

    struct Scripted {
        responses: Mutex<VecDeque<ApiResponse>>,
        sent: Mutex<Vec<ApiRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<ApiResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.sent.lock().unwrap().push(request);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected extra request")))
        }
    }

    #[derive(Default)]
    struct Collecting {
        records: Mutex<Vec<OperationRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl AuditSink for Collecting {
        async fn record(&self, entry: &OperationRecord) -> Result<(), AuditError> {
            self.records.lock().unwrap().push(entry.clone());
            if self.fail {
                Err(AuditError::unavailable("down"))
            } else {
                Ok(())
            }
        }
    }

    fn challenge(nonce: &str) -> ApiResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            WWW_AUTHENTICATE,
            HeaderValue::from_str(&format!(
                r#"Digest realm="MMS Public API", nonce="{nonce}", algorithm=MD5, qop="auth""#
            ))
            .unwrap(),
        );
        ApiResponse {
            status: StatusCode::UNAUTHORIZED,
            headers,
            body: String::new(),
        }
    }

    fn ok(body: serde_json::Value) -> ApiResponse {
        ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    fn config() -> ResizeConfig {
        ResizeConfig::from_settings(ResizeSettings {
            public_key: Some("pub".to_string()),
            private_key: Some("priv".to_string()),
            project_id: Some("p1".to_string()),
            cluster_name: Some("c0".to_string()),
            target_instance_size: Some("M40".to_string()),
            ..ResizeSettings::default()
        })
        .unwrap()
    }

    fn topology() -> serde_json::Value {
        serde_json::json!({
            "stateName": "IDLE",
            "replicationSpecs": [{
                "numShards": 1,
                "zoneName": "Zone 1",
                "regionConfigs": [{
                    "providerName": "AWS",
                    "regionName": "US_EAST_1",
                    "priority": 7,
                    "electableSpecs": {"instanceSize": "M30", "nodeCount": 3}
                }]
            }]
        })
    }

    #[tokio::test]
    async fn test_run_completes_and_audits_success() {
        let transport = Scripted::new(vec![
            challenge("n-get"),
            ok(topology()),
            challenge("n-patch"),
            ok(serde_json::json!({"stateName": "UPDATING"})),
        ]);
        let audit = Arc::new(Collecting::default());
        let mut orchestrator = ResizeOrchestrator::new(config(), transport.clone(), audit.clone());

        let outcome = orchestrator.run().await;

        assert!(outcome.success, "{outcome:?}");
        assert_eq!(orchestrator.state(), ResizeState::Completed);
        assert_eq!(outcome.previous_size.as_deref(), Some("M30"));
        assert_eq!(outcome.new_size.as_deref(), Some("M40"));
        assert_eq!(outcome.state_name.as_deref(), Some("UPDATING"));
        assert_eq!(
            outcome.message.as_deref(),
            Some("Cluster resize initiated: UPDATING")
        );

        let sent = transport.sent.lock().unwrap();
        let methods: Vec<&Method> = sent.iter().map(|r| &r.method).collect();
        assert_eq!(methods, [&Method::GET, &Method::GET, &Method::PATCH, &Method::PATCH]);
        assert_eq!(
            sent[0].headers.get(ACCEPT).unwrap(),
            "application/vnd.atlas.2023-02-01+json"
        );

        let records = audit.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "UPDATING");
        assert_eq!(records[0].from_size.as_deref(), Some("M30"));
    }

    #[tokio::test]
    async fn test_empty_topology_fails_before_patch() {
        let transport = Scripted::new(vec![
            challenge("n-get"),
            ok(serde_json::json!({"replicationSpecs": []})),
        ]);
        let audit = Arc::new(Collecting::default());
        let mut orchestrator = ResizeOrchestrator::new(config(), transport.clone(), audit.clone());

        let outcome = orchestrator.run().await;

        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::NoTopologyFound));
        assert_eq!(orchestrator.state(), ResizeState::Failed);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
        assert_eq!(audit.records.lock().unwrap()[0].status, "failed");
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_outcome() {
        let transport = Scripted::new(vec![
            challenge("n-get"),
            ok(topology()),
            challenge("n-patch"),
            ok(serde_json::json!({"stateName": "UPDATING"})),
        ]);
        let audit = Arc::new(Collecting {
            fail: true,
            ..Collecting::default()
        });
        let mut orchestrator = ResizeOrchestrator::new(config(), transport, audit.clone());

        let outcome = orchestrator.run().await;

        assert!(outcome.success);
        assert_eq!(audit.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_patch_body_still_succeeds() {
        let transport = Scripted::new(vec![
            challenge("n-get"),
            ok(topology()),
            challenge("n-patch"),
            ApiResponse {
                status: StatusCode::ACCEPTED,
                headers: HeaderMap::new(),
                body: String::new(),
            },
        ]);
        let mut orchestrator =
            ResizeOrchestrator::new(config(), transport, Arc::new(Collecting::default()));

        let outcome = orchestrator.run().await;

        assert!(outcome.success);
        assert_eq!(outcome.state_name, None);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Cluster resize initiated: UNKNOWN")
        );
    }

    #[tokio::test]
    async fn test_invalid_cluster_description_is_reported_with_body() {
        let transport = Scripted::new(vec![
            challenge("n-get"),
            ApiResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: "<html>".to_string(),
            },
        ]);
        let mut orchestrator =
            ResizeOrchestrator::new(config(), transport, Arc::new(Collecting::default()));

        let outcome = orchestrator.run().await;

        assert_eq!(outcome.error_kind, Some(ErrorKind::InvalidPayload));
        assert_eq!(outcome.response_body.as_deref(), Some("<html>"));
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(ResizeState::FetchingCurrentSpec.to_string(), "fetching_current_spec");
        assert_eq!(ResizeState::Failed.to_string(), "failed");
    }
}
