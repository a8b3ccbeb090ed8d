//! One digest-authenticated HTTP exchange: probe, challenge, sign, retry.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{debug, instrument};

use super::challenge::AuthChallenge;
use super::error::{ChallengeError, DigestError};
use super::signer::DigestSigner;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Runs authenticated exchanges against one transport with one credential pair.
///
/// Every call to [`execute`](Self::execute) performs its own unauthenticated
/// probe, so each exchange answers a fresh server nonce. Challenges are never
/// carried from one exchange to the next.
pub struct DigestStep<'a> {
    transport: &'a dyn HttpTransport,
    signer: &'a DigestSigner,
}

impl<'a> DigestStep<'a> {
    /// Creates a step bound to `transport` and `signer`.
    #[must_use]
    pub fn new(transport: &'a dyn HttpTransport, signer: &'a DigestSigner) -> Self {
        Self { transport, signer }
    }

    /// Sends `request` unauthenticated, answers the 401 challenge, and
    /// resends it with an `Authorization` header.
    ///
    /// # Errors
    ///
    /// - [`DigestError::ChallengeExpected`] if the probe succeeds without a challenge
    /// - [`DigestError::MalformedChallenge`] if the 401 carries no usable digest challenge
    /// - [`DigestError::UnexpectedStatus`] if the probe returns neither 401 nor 2xx,
    ///   or the authenticated retry is not 2xx
    /// - [`DigestError::Transport`] on network failure or timeout
    #[instrument(
        skip(self, request),
        fields(method = %request.method, url = %request.url)
    )]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, DigestError> {
        let method = request.method.clone();
        let url = request.url.to_string();

        let probe = self.transport.send(request.clone()).await?;
        debug!(status = probe.status.as_u16(), "probe response");

        if probe.status.is_success() {
            return Err(DigestError::challenge_expected(
                method.as_str(),
                probe.status.as_u16(),
            ));
        }
        if probe.status != StatusCode::UNAUTHORIZED {
            return Err(DigestError::unexpected_status(
                method.as_str(),
                &url,
                probe.status.as_u16(),
                &probe.body,
            ));
        }

        let challenge = AuthChallenge::parse(probe.www_authenticate())
            .map_err(|source| DigestError::malformed_challenge(method.as_str(), source))?;
        debug!(
            realm = %challenge.realm,
            qop = ?challenge.qop,
            algorithm = ?challenge.algorithm,
            user = %self.signer.credentials().redacted_username(),
            "digest challenge received"
        );

        let authorization = self
            .signer
            .sign(method.as_str(), request.digest_uri(), &challenge);
        let mut header = HeaderValue::from_str(&authorization.to_string()).map_err(|_| {
            DigestError::malformed_challenge(method.as_str(), ChallengeError::UnencodableResponse)
        })?;
        header.set_sensitive(true);

        let response = self
            .transport
            .send(request.header(AUTHORIZATION, header))
            .await?;
        debug!(status = response.status.as_u16(), "authenticated response");

        if !response.status.is_success() {
            return Err(DigestError::unexpected_status(
                method.as_str(),
                &url,
                response.status.as_u16(),
                &response.body,
            ));
        }

        Ok(response)
    }
}
