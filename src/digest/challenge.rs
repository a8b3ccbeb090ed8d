//! `WWW-Authenticate: Digest ...` challenge parsing.
//!
//! The parameter list is split by a small tokenizer that understands the two
//! value forms allowed by RFC 7235 `auth-param`:
//!
//! - `quoted-string`: `key="value, with commas"` (backslash escapes honoured)
//! - `token`: `key=value` terminated by the next comma
//!
//! Unknown parameters are ignored. Parameters may appear in any order, with or
//! without whitespace around `=` and `,`.

use super::error::ChallengeError;

/// Scheme name, matched case-insensitively.
const DIGEST_SCHEME: &str = "digest";

/// A parsed digest challenge.
///
/// The server contract makes `nonce` single-use: one challenge is consumed by
/// exactly one authenticated exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Protection space the credentials belong to.
    pub realm: String,
    /// Server nonce.
    pub nonce: String,
    /// Quality of protection offered (`auth`, or a list such as `auth, auth-int`).
    pub qop: Option<String>,
    /// Hash algorithm advertised by the server.
    pub algorithm: Option<String>,
    /// Opaque server state to be echoed back.
    pub opaque: Option<String>,
}

impl AuthChallenge {
    /// Parses a `WWW-Authenticate` header value.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError`] when the header is missing, does not name
    /// the digest scheme, has an unterminated quoted value, or lacks `realm`
    /// or `nonce`.
    pub fn parse(header: Option<&str>) -> Result<Self, ChallengeError> {
        let header = header.ok_or(ChallengeError::MissingHeader)?;
        let params = digest_params(header).ok_or_else(|| ChallengeError::not_digest(header))?;

        let mut realm = None;
        let mut nonce = None;
        let mut qop = None;
        let mut algorithm = None;
        let mut opaque = None;

        for param in ParamTokenizer::new(params) {
            let AuthParam { key, value } = param?;
            let slot = match key.to_ascii_lowercase().as_str() {
                "realm" => &mut realm,
                "nonce" => &mut nonce,
                "qop" => &mut qop,
                "algorithm" => &mut algorithm,
                "opaque" => &mut opaque,
                _ => continue,
            };
            // First occurrence wins.
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        Ok(Self {
            realm: realm.ok_or(ChallengeError::MissingParameter("realm"))?,
            nonce: nonce.ok_or(ChallengeError::MissingParameter("nonce"))?,
            qop,
            algorithm,
            opaque,
        })
    }

    /// Returns true when the server offers `qop=auth`, alone or in a list.
    #[must_use]
    pub fn offers_qop_auth(&self) -> bool {
        self.qop.as_deref().is_some_and(|qop| {
            qop.split(',')
                .any(|option| option.trim().eq_ignore_ascii_case("auth"))
        })
    }
}

/// Returns the text following the `Digest` scheme token, if present.
///
/// The scheme only counts at the start of the header or after a top-level
/// comma, outside quoted values, and must be followed by whitespace or the
/// end of the header. A header may carry several challenges.
fn digest_params(header: &str) -> Option<&str> {
    let bytes = header.as_bytes();
    let mut at_boundary = true;
    let mut in_quotes = false;
    let mut pos = 0;
    while let Some(&b) = bytes.get(pos) {
        if in_quotes {
            match b {
                b'\\' => pos += 1,
                b'"' => in_quotes = false,
                _ => {}
            }
        } else if b == b'"' {
            in_quotes = true;
            at_boundary = false;
        } else if b == b',' {
            at_boundary = true;
        } else if !b.is_ascii_whitespace() && at_boundary {
            let end = pos + DIGEST_SCHEME.len();
            let is_scheme = bytes
                .get(pos..end)
                .is_some_and(|word| word.eq_ignore_ascii_case(DIGEST_SCHEME.as_bytes()))
                && bytes.get(end).is_none_or(u8::is_ascii_whitespace);
            if is_scheme {
                return Some(&header[end..]);
            }
            at_boundary = false;
        }
        pos += 1;
    }
    None
}

/// One `key=value` pair from the challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AuthParam<'a> {
    key: &'a str,
    value: String,
}

/// Iterates over `auth-param` pairs in a challenge parameter list.
///
/// Bare tokens that are not followed by `=` are skipped.
struct ParamTokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ParamTokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
    }

    fn read_key(&mut self) -> &'a str {
        let start = self.pos;
        self.skip_while(|b| !(b == b'=' || b == b',' || b.is_ascii_whitespace()));
        &self.input[start..self.pos]
    }

    fn read_quoted(&mut self, key: &str) -> Result<String, ChallengeError> {
        // Opening quote.
        self.pos += 1;
        let input = self.input;
        let mut value = String::new();
        let mut chars = input[self.pos..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(value);
                }
                '\\' => match chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                other => value.push(other),
            }
        }
        Err(ChallengeError::unterminated_quote(key))
    }

    fn read_token(&mut self) -> String {
        let start = self.pos;
        self.skip_while(|b| b != b',');
        self.input[start..self.pos].trim_end().to_string()
    }
}

impl<'a> Iterator for ParamTokenizer<'a> {
    type Item = Result<AuthParam<'a>, ChallengeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.skip_while(|b| b == b',' || b.is_ascii_whitespace());
            self.peek()?;

            let key = self.read_key();
            self.skip_while(|b| b.is_ascii_whitespace());
            if key.is_empty() || self.peek() != Some(b'=') {
                // Bare token (or stray '='); drop it and move on.
                self.skip_while(|b| b != b',');
                continue;
            }

            self.pos += 1;
            self.skip_while(|b| b.is_ascii_whitespace());
            let value = if self.peek() == Some(b'"') {
                match self.read_quoted(key) {
                    Ok(value) => value,
                    Err(error) => {
                        self.pos = self.input.len();
                        return Some(Err(error));
                    }
                }
            } else {
                self.read_token()
            };

            return Some(Ok(AuthParam { key, value }));
        }
    }
}
