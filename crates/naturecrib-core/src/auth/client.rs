//! Remote auth client.
//!
//! Issues the two exchange requests (password sign-in, delegated provider
//! sign-in) and normalizes their heterogeneous responses into
//! [`SubmissionOutcome`]. Single-shot, non-retrying: the user re-triggers
//! submission after any failure.

use serde::Deserialize;

use super::credentials::Credentials;
use super::provider::{IdentityProvider, ProviderConfig, ProviderSignIn};
use super::{MSG_GOOGLE_SUCCESS, MSG_NETWORK_ERROR, SubmissionOutcome};
use crate::session::Session;

/// Sentinel value of the response `status` field marking success.
const STATUS_SUCCESS: &str = "SUCCESS";

/// Wire shape of the sign-in response.
///
/// The contract is exactly `{status, message, data: [record, ...]}`; on
/// success the session record is the first element of `data`.
#[derive(Debug, Deserialize)]
struct SignInResponse {
    status: String,
    message: String,
    #[serde(default)]
    data: Vec<Session>,
}

/// Client for the remote account service.
pub struct AuthClient {
    http: reqwest::Client,
    signin_url: String,
}

impl AuthClient {
    pub fn new(signin_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            signin_url: signin_url.into(),
        }
    }

    /// Password sign-in: one POST of the credentials to the configured
    /// endpoint.
    ///
    /// Transport-level failures (unreachable host, non-2xx status,
    /// unparseable body) settle as `TransportError` with a fixed generic
    /// message; the underlying cause is logged, never shown.
    pub async fn sign_in(&self, credentials: &Credentials) -> SubmissionOutcome {
        let response = match self
            .http
            .post(&self.signin_url)
            .json(credentials)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "sign-in request failed");
                return SubmissionOutcome::TransportError(MSG_NETWORK_ERROR.to_string());
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "sign-in endpoint returned an error status");
            return SubmissionOutcome::TransportError(MSG_NETWORK_ERROR.to_string());
        }

        let body: SignInResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse sign-in response");
                return SubmissionOutcome::TransportError(MSG_NETWORK_ERROR.to_string());
            }
        };

        if body.status != STATUS_SUCCESS {
            return SubmissionOutcome::Rejected(body.message);
        }

        match body.data.into_iter().next() {
            Some(session) => SubmissionOutcome::Success {
                session,
                message: body.message,
            },
            // The contract assumes data is non-empty on success; an empty
            // array is a malformed response, not a rejection.
            None => {
                tracing::warn!("sign-in response reported SUCCESS with empty data");
                SubmissionOutcome::TransportError(MSG_NETWORK_ERROR.to_string())
            }
        }
    }

    /// Delegated sign-in via a third-party identity provider.
    ///
    /// Cancellation settles as `Cancelled`; provider success wraps the
    /// minimal profile subset as the session.
    pub async fn sign_in_with_provider<P: IdentityProvider>(
        &self,
        provider: &P,
        config: &ProviderConfig,
    ) -> SubmissionOutcome {
        match provider.log_in(config).await {
            Ok(ProviderSignIn::Success { user }) => SubmissionOutcome::Success {
                session: user.into_session(),
                message: MSG_GOOGLE_SUCCESS.to_string(),
            },
            Ok(ProviderSignIn::Cancelled) => SubmissionOutcome::Cancelled,
            Err(err) => {
                tracing::warn!(error = %err, "provider sign-in failed");
                SubmissionOutcome::TransportError(MSG_NETWORK_ERROR.to_string())
            }
        }
    }
}
