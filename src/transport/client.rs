//! reqwest-backed [`HttpTransport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{ApiRequest, ApiResponse, HttpTransport, TransportError};
use crate::user_agent;

/// Upper bound for one cluster API call, connect through body read.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for cluster API calls.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production transport. Create once per invocation and reuse for every call
/// so the probe and the authenticated retry share a pooled connection.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] when the TLS backend or system
    /// configuration prevents building a client.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a transport with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] when the client cannot be built.
    pub fn with_timeouts(
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let url_text = url.to_string();

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::from_reqwest(&url_text, error))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::from_reqwest(&url_text, error))?;

        debug!(status = status.as_u16(), body_bytes = body.len(), "response received");

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
