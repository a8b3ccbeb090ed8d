//! Digest `Authorization` header computation (RFC 2069 / RFC 7616, MD5).
//!
//! ```text
//! HA1      = MD5(username ":" realm ":" password)
//! HA2      = MD5(method ":" uri)
//! response = MD5(HA1 ":" nonce ":" nc ":" cnonce ":" qop ":" HA2)   qop=auth
//! response = MD5(HA1 ":" nonce ":" HA2)                             no qop
//! ```
//!
//! MD5 is what the cluster API's digest implementation speaks; it is not a
//! free choice.

use std::fmt::{self, Write as _};

use md5::{Digest, Md5};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;

use super::challenge::AuthChallenge;

/// Nonce count sent with every response. Each server nonce is used exactly
/// once, so the count never advances past the first use.
pub const FIRST_NONCE_COUNT: u32 = 1;

/// Number of random bytes in a client nonce.
const CLIENT_NONCE_BYTES: usize = 16;

/// Number of username characters shown in debug output.
const USERNAME_VISIBLE_CHARS: usize = 4;

/// API key pair used as the digest username and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Digest username (the public API key).
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Username trimmed to a short prefix for diagnostics.
    #[must_use]
    pub fn redacted_username(&self) -> String {
        let prefix: String = self.username.chars().take(USERNAME_VISIBLE_CHARS).collect();
        format!("{prefix}***")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.redacted_username())
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Inputs for one digest response. Built once per authenticated exchange.
#[derive(Debug, Clone)]
pub struct DigestContext<'a> {
    /// HTTP method of the authenticated request.
    pub method: &'a str,
    /// Request-URI (path only).
    pub uri: &'a str,
    /// Challenge being answered.
    pub challenge: &'a AuthChallenge,
    /// Credentials proving knowledge of the password.
    pub credentials: &'a Credentials,
    /// Nonce count (`nc`).
    pub nonce_count: u32,
    /// Client nonce (`cnonce`).
    pub client_nonce: String,
}

impl<'a> DigestContext<'a> {
    /// Creates a context with a freshly generated client nonce.
    #[must_use]
    pub fn new(
        method: &'a str,
        uri: &'a str,
        challenge: &'a AuthChallenge,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            method,
            uri,
            challenge,
            credentials,
            nonce_count: FIRST_NONCE_COUNT,
            client_nonce: generate_client_nonce(),
        }
    }

    /// Replaces the client nonce, for reproducing published test vectors.
    #[must_use]
    pub fn with_client_nonce(mut self, client_nonce: impl Into<String>) -> Self {
        self.client_nonce = client_nonce.into();
        self
    }

    /// Computes the `Authorization` header for this context.
    #[must_use]
    pub fn authorize(&self) -> AuthorizationHeader {
        let challenge = self.challenge;
        let ha1 = md5_hex(&format!(
            "{}:{}:{}",
            self.credentials.username, challenge.realm, self.credentials.password
        ));
        let ha2 = md5_hex(&format!("{}:{}", self.method, self.uri));

        let (response, qop) = if challenge.offers_qop_auth() {
            let nc = format_nonce_count(self.nonce_count);
            let response = md5_hex(&format!(
                "{ha1}:{}:{nc}:{}:auth:{ha2}",
                challenge.nonce, self.client_nonce
            ));
            let qop = QopAuth {
                nc,
                cnonce: self.client_nonce.clone(),
            };
            (response, Some(qop))
        } else {
            (md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce)), None)
        };

        AuthorizationHeader {
            username: self.credentials.username.clone(),
            realm: challenge.realm.clone(),
            nonce: challenge.nonce.clone(),
            uri: self.uri.to_string(),
            qop,
            response,
            algorithm: challenge.algorithm.clone(),
            opaque: challenge.opaque.clone(),
        }
    }
}

/// Signs requests with one credential pair.
#[derive(Debug, Clone)]
pub struct DigestSigner {
    credentials: Credentials,
}

impl DigestSigner {
    /// Creates a signer for the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Credentials this signer answers with.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Answers `challenge` for `method uri` with a fresh client nonce.
    #[must_use]
    pub fn sign(&self, method: &str, uri: &str, challenge: &AuthChallenge) -> AuthorizationHeader {
        if let Some(algorithm) = challenge.algorithm.as_deref()
            && !algorithm.eq_ignore_ascii_case("MD5")
        {
            warn!(algorithm, "server advertised a non-MD5 digest algorithm; answering with MD5");
        }
        DigestContext::new(method, uri, challenge, &self.credentials).authorize()
    }
}

/// The `qop=auth` extension fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QopAuth {
    /// Nonce count, eight hex digits.
    pub nc: String,
    /// Client nonce.
    pub cnonce: String,
}

/// A computed `Authorization: Digest ...` value.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    /// Digest username.
    pub username: String,
    /// Realm echoed from the challenge.
    pub realm: String,
    /// Server nonce echoed from the challenge.
    pub nonce: String,
    /// Request-URI the response covers.
    pub uri: String,
    /// Present when answering in `qop=auth` mode.
    pub qop: Option<QopAuth>,
    /// Hex digest response.
    pub response: String,
    /// Algorithm echoed from the challenge.
    pub algorithm: Option<String>,
    /// Opaque echoed from the challenge.
    pub opaque: Option<String>,
}

impl fmt::Display for AuthorizationHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Digest username={}, realm={}, nonce={}, uri={}",
            Quoted(&self.username),
            Quoted(&self.realm),
            Quoted(&self.nonce),
            Quoted(&self.uri)
        )?;
        if let Some(qop) = &self.qop {
            write!(f, ", qop=auth, nc={}, cnonce={}", qop.nc, Quoted(&qop.cnonce))?;
        }
        write!(f, ", response={}", Quoted(&self.response))?;
        if let Some(algorithm) = &self.algorithm {
            write!(f, ", algorithm={algorithm}")?;
        }
        if let Some(opaque) = &self.opaque {
            write!(f, ", opaque={}", Quoted(opaque))?;
        }
        Ok(())
    }
}

/// Renders a value as an RFC 7230 `quoted-string`, escaping `"` and `\`.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for ch in self.0.chars() {
            if matches!(ch, '"' | '\\') {
                f.write_char('\\')?;
            }
            f.write_char(ch)?;
        }
        f.write_char('"')
    }
}

// The header value proves knowledge of the password; keep it out of logs.
impl fmt::Debug for AuthorizationHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationHeader")
            .field("realm", &self.realm)
            .field("uri", &self.uri)
            .field("qop", &self.qop.is_some())
            .finish_non_exhaustive()
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

fn format_nonce_count(count: u32) -> String {
    format!("{count:08x}")
}

/// Generates a client nonce from the operating system CSPRNG.
fn generate_client_nonce() -> String {
    let mut bytes = [0u8; CLIENT_NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{:032x}", u128::from_be_bytes(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rfc2069_challenge() -> AuthChallenge {
        AuthChallenge {
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            qop: None,
            algorithm: None,
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
        }
    }

    #[test]
    fn test_escaped_realm_survives_sign_and_reparse() {
        let challenge =
            AuthChallenge::parse(Some(r#"Digest realm="say \"hi\" \\ there", nonce="n""#)).unwrap();
        assert_eq!(challenge.realm, r#"say "hi" \ there"#);

        let signer = DigestSigner::new(Credentials::new("u", "p"));
        let rendered = signer.sign("GET", "/x", &challenge).to_string();
        assert!(rendered.contains(r#"realm="say \"hi\" \\ there""#), "{rendered}");

        let reparsed = AuthChallenge::parse(Some(&rendered)).unwrap();
        assert_eq!(reparsed.realm, challenge.realm);
        assert_eq!(reparsed.nonce, "n");
    }

    #[test]
    fn test_rfc2069_reference_vector_without_qop() {
        let challenge = rfc2069_challenge();
        let credentials = Credentials::new("Mufasa", "CircleOfLife");
        let header =
            DigestContext::new("GET", "/dir/index.html", &challenge, &credentials).authorize();

        assert_eq!(header.response, "1949323746fe6a43ef61f9606e7febea");
        assert_eq!(header.qop, None);
        assert_eq!(
            header.to_string(),
            r#"Digest username="Mufasa", realm="testrealm@host.com", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", uri="/dir/index.html", response="1949323746fe6a43ef61f9606e7febea", opaque="5ccc069c403ebaf9f0171e9517f40e41""#
        );
    }

    #[test]
    fn test_rfc2617_reference_vector_with_qop_auth() {
        let challenge = AuthChallenge {
            qop: Some("auth".to_string()),
            ..rfc2069_challenge()
        };
        let credentials = Credentials::new("Mufasa", "Circle Of Life");
        let header = DigestContext::new("GET", "/dir/index.html", &challenge, &credentials)
            .with_client_nonce("0a4f113b")
            .authorize();

        assert_eq!(header.response, "6629fae49393a05397450978507c4ef1");
        assert_eq!(
            header.to_string(),
            r#"Digest username="Mufasa", realm="testrealm@host.com", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", uri="/dir/index.html", qop=auth, nc=00000001, cnonce="0a4f113b", response="6629fae49393a05397450978507c4ef1", opaque="5ccc069c403ebaf9f0171e9517f40e41""#
        );
    }

    #[test]
    fn test_rfc7616_md5_vector_with_qop_list() {
        let challenge = AuthChallenge::parse(Some(
            r#"Digest realm="http-auth@example.org", qop="auth, auth-int", algorithm=MD5, nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS""#,
        ))
        .unwrap();
        let credentials = Credentials::new("Mufasa", "Circle of Life");
        let header = DigestContext::new("GET", "/dir/index.html", &challenge, &credentials)
            .with_client_nonce("f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ")
            .authorize();

        assert_eq!(header.response, "8ca523f5e9506fed4657c9700eebdbec");
        let rendered = header.to_string();
        assert!(rendered.contains(", qop=auth, nc=00000001, "), "{rendered}");
        assert!(rendered.contains(", algorithm=MD5"), "{rendered}");
    }

    #[test]
    fn test_sign_generates_distinct_client_nonces() {
        let challenge = AuthChallenge {
            qop: Some("auth".to_string()),
            ..rfc2069_challenge()
        };
        let signer = DigestSigner::new(Credentials::new("user", "secret"));

        let first = signer.sign("GET", "/api/x", &challenge);
        let second = signer.sign("GET", "/api/x", &challenge);

        let first_cnonce = first.qop.unwrap().cnonce;
        let second_cnonce = second.qop.unwrap().cnonce;
        assert_eq!(first_cnonce.len(), 32);
        assert_ne!(first_cnonce, second_cnonce);
        assert_ne!(first.response, second.response);
    }

    #[test]
    fn test_header_field_order_and_quoting() {
        let challenge = AuthChallenge {
            realm: "r".to_string(),
            nonce: "n".to_string(),
            qop: Some("auth".to_string()),
            algorithm: Some("MD5".to_string()),
            opaque: None,
        };
        let credentials = Credentials::new("u", "p");
        let rendered = DigestContext::new("PATCH", "/p", &challenge, &credentials)
            .with_client_nonce("c")
            .authorize()
            .to_string();

        let order = [
            r#"username="u""#,
            r#"realm="r""#,
            r#"nonce="n""#,
            r#"uri="/p""#,
            "qop=auth",
            "nc=00000001",
            r#"cnonce="c""#,
            "response=\"",
            "algorithm=MD5",
        ];
        let mut last = 0;
        for field in order {
            let at = rendered.find(field).unwrap();
            assert!(at >= last, "{field} out of order in {rendered}");
            last = at;
        }
        assert!(!rendered.contains("opaque"));
    }

    #[test]
    fn test_method_is_part_of_the_digest() {
        let challenge = rfc2069_challenge();
        let credentials = Credentials::new("u", "p");
        let get = DigestContext::new("GET", "/c", &challenge, &credentials).authorize();
        let patch = DigestContext::new("PATCH", "/c", &challenge, &credentials).authorize();
        assert_ne!(get.response, patch.response);
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let credentials = Credentials::new("abcdefgh", "very-secret-key");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("very-secret-key"), "{debug}");
        assert!(!debug.contains("abcdefgh"), "{debug}");
        assert!(debug.contains("abcd***"), "{debug}");
    }

    #[test]
    fn test_authorization_debug_omits_response() {
        let challenge = rfc2069_challenge();
        let credentials = Credentials::new("Mufasa", "CircleOfLife");
        let header =
            DigestContext::new("GET", "/dir/index.html", &challenge, &credentials).authorize();
        let debug = format!("{header:?}");
        assert!(!debug.contains(&header.response), "{debug}");
    }
}
