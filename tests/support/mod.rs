//! Shared fixtures for integration tests: a digest-checking mock cluster API.
//!
//! The matchers here let wiremock play the server side of the digest
//! exchange: unauthenticated probes get a challenge, and only requests whose
//! `response` hash is valid for a given nonce reach the real handler.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use atlas_resize_core::{ResizeSettings, ReqwestTransport};
use md5::{Digest, Md5};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const PUBLIC_KEY: &str = "testpublickey";
pub const PRIVATE_KEY: &str = "0f9a-private-key";
pub const PROJECT_ID: &str = "5f1a2b3c4d5e6f7a8b9c0d1e";
pub const CLUSTER_NAME: &str = "orders-prod";
pub const REALM: &str = "MMS Public API";
pub const API_PREFIX: &str = "/api/atlas/v2";

/// Path of the cluster resource on the mock server.
pub fn cluster_path() -> String {
    format!("{API_PREFIX}/groups/{PROJECT_ID}/clusters/{CLUSTER_NAME}")
}

/// Complete settings pointing at `server`.
pub fn settings_for(server: &MockServer) -> ResizeSettings {
    ResizeSettings {
        public_key: Some(PUBLIC_KEY.to_string()),
        private_key: Some(PRIVATE_KEY.to_string()),
        project_id: Some(PROJECT_ID.to_string()),
        cluster_name: Some(CLUSTER_NAME.to_string()),
        target_instance_size: Some("M40".to_string()),
        api_base_url: Some(format!("{}{API_PREFIX}", server.uri())),
        triggered_by: None,
    }
}

pub fn transport() -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new().expect("transport should build"))
}

/// Single-region replica set currently on `size`.
pub fn cluster_description(size: &str) -> Value {
    json!({
        "name": CLUSTER_NAME,
        "stateName": "IDLE",
        "replicationSpecs": [{
            "id": "6543a1",
            "numShards": 1,
            "zoneName": "Zone 1",
            "regionConfigs": [{
                "providerName": "AWS",
                "regionName": "US_EAST_1",
                "priority": 7,
                "electableSpecs": {
                    "instanceSize": size,
                    "nodeCount": 3,
                    "diskIOPS": 3000,
                    "ebsVolumeType": "STANDARD"
                },
                "readOnlySpecs": {"instanceSize": size, "nodeCount": 0}
            }]
        }]
    })
}

/// `WWW-Authenticate` value the mock API issues.
pub fn challenge_header(nonce: &str) -> String {
    format!(r#"Digest realm="{REALM}", domain="", nonce="{nonce}", algorithm=MD5, qop="auth", stale=false"#)
}

/// 401 carrying a digest challenge for `nonce`.
pub fn challenge(nonce: &str) -> ResponseTemplate {
    ResponseTemplate::new(401)
        .insert_header("WWW-Authenticate", challenge_header(nonce).as_str())
        .set_body_json(json!({"error": 401, "reason": "Unauthorized"}))
}

/// Matches requests without an `Authorization` header.
pub struct Unauthenticated;

impl Match for Unauthenticated {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// Matches requests carrying a digest response that verifies against `nonce`.
pub struct ValidDigest {
    pub nonce: &'static str,
}

impl Match for ValidDigest {
    fn matches(&self, request: &Request) -> bool {
        let Some(params) = authorization_params(request) else {
            return false;
        };
        let field = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();
        if field("nonce") != self.nonce || field("username") != PUBLIC_KEY {
            return false;
        }

        let ha1 = md5_hex(&format!("{PUBLIC_KEY}:{}:{PRIVATE_KEY}", field("realm")));
        let ha2 = md5_hex(&format!("{}:{}", request.method.as_str(), field("uri")));
        let expected = md5_hex(&format!(
            "{ha1}:{}:{}:{}:{}:{ha2}",
            field("nonce"),
            field("nc"),
            field("cnonce"),
            field("qop"),
        ));
        field("uri") == request.url.path() && field("response") == expected
    }
}

/// Parameters of the request's digest `Authorization` header.
pub fn authorization_params(request: &Request) -> Option<HashMap<String, String>> {
    let value = request.headers.get("authorization")?.to_str().ok()?;
    let rest = value.strip_prefix("Digest ")?;
    Some(
        rest.split(", ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, raw)| (key.to_string(), raw.trim_matches('"').to_string()))
            .collect(),
    )
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Mounts the full two-phase exchange: each verb is challenged with its own
/// nonce, and only correctly signed requests get through.
pub async fn mount_resize_api(server: &MockServer, current_size: &str, state_after: &str) {
    Mock::given(method("GET"))
        .and(path(cluster_path()))
        .and(Unauthenticated)
        .respond_with(challenge("nonce-get-1"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(cluster_path()))
        .and(ValidDigest {
            nonce: "nonce-get-1",
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(cluster_description(current_size)))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(cluster_path()))
        .and(Unauthenticated)
        .respond_with(challenge("nonce-patch-2"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(cluster_path()))
        .and(ValidDigest {
            nonce: "nonce-patch-2",
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": CLUSTER_NAME,
            "stateName": state_after
        })))
        .expect(1)
        .mount(server)
        .await;
}
