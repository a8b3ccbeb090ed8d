//! HTTP transport seam for the cluster API.
//!
//! The orchestrator and the digest step talk to the network only through the
//! [`HttpTransport`] trait, so tests can substitute scripted doubles and the
//! binary can plug in [`ReqwestTransport`].
//!
//! Transports return every HTTP status as a normal [`ApiResponse`]; deciding
//! which statuses are acceptable belongs to the caller. Only failures that
//! never produced a response (connect errors, timeouts) are errors here.

mod client;
mod error;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub use client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, ReqwestTransport};
pub use error::TransportError;

/// A request to send through an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Headers to send in addition to the transport defaults.
    pub headers: HeaderMap,
    /// Serialized JSON body.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Creates a bodiless request.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Adds (or replaces) a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when `body` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Request-URI used for digest signing: the path, without query string.
    #[must_use]
    pub fn digest_uri(&self) -> &str {
        self.url.path()
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body as text.
    pub body: String,
}

impl ApiResponse {
    /// Returns the `WWW-Authenticate` header, if present and valid text.
    #[must_use]
    pub fn www_authenticate(&self) -> Option<&str> {
        self.headers
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Sends HTTP requests on behalf of the resize workflow.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request and reads the whole response.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}
