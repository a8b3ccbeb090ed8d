//! User-Agent string sent with every cluster API request.

/// Project URL for User-Agent identification (RFC 9308 good citizenship).
const PROJECT_UA_URL: &str = "https://github.com/fierce/atlas-resize";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("atlas-resize/{version} (cluster-automation; +{PROJECT_UA_URL})")
}
