//! HTTP Digest authentication client.
//!
//! - [`AuthChallenge`] parses a `WWW-Authenticate` challenge
//! - [`DigestSigner`] computes the `Authorization` response (MD5, optional `qop=auth`)
//! - [`DigestStep`] drives one probe / challenge / authenticated-retry exchange
//!
//! The cluster API issues a single-use nonce per challenge, so every HTTP
//! method gets its own [`DigestStep::execute`] call and its own challenge.

mod challenge;
mod error;
mod signer;
mod step;

pub use challenge::AuthChallenge;
pub use error::{ChallengeError, DigestError};
pub use signer::{
    AuthorizationHeader, Credentials, DigestContext, DigestSigner, FIRST_NONCE_COUNT, QopAuth,
};
pub use step::DigestStep;
