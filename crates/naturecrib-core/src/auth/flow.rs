//! Submission state machine.
//!
//! One [`LoginFlow`] owns the remote client, the session store, the status
//! reporter, and both per-path in-flight flags. Both submission paths are
//! serialized through this single owner, so the shared status slot cannot be
//! raced by concurrent paths; the per-path flags remain the re-entry
//! contract surfaced to the presentation layer (disable the button while
//! raised).
//!
//! Per-path lifecycle: Idle -> InFlight -> Idle. The flag is lowered
//! unconditionally on settle, regardless of outcome, so submission is always
//! re-triggerable after any failure.

use super::client::AuthClient;
use super::credentials::Credentials;
use super::provider::{IdentityProvider, ProviderConfig};
use super::status::{StatusKind, StatusReporter};
use super::{MSG_GOOGLE_CANCELLED, MSG_PERSIST_FAILED, SubmissionOutcome};
use crate::session::{Session, SessionStore};

/// What to do with the session after a successful exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessPolicy {
    /// Write the session to the store; the caller may then transition.
    Persist,
    /// Skip persistence and hand the session straight to the caller
    /// (navigation collaborator).
    Handoff,
}

/// Orchestrates credential submission for both authentication paths.
pub struct LoginFlow {
    client: AuthClient,
    store: SessionStore,
    status: StatusReporter,
    policy: SuccessPolicy,
    password_in_flight: bool,
    provider_in_flight: bool,
}

impl LoginFlow {
    pub fn new(client: AuthClient, store: SessionStore, policy: SuccessPolicy) -> Self {
        Self {
            client,
            store,
            status: StatusReporter::new(),
            policy,
            password_in_flight: false,
            provider_in_flight: false,
        }
    }

    /// Password-path submission.
    ///
    /// Sequencing: re-entry guard, status clear, validation (invalid input
    /// never raises the flag or touches the network), flag raise, remote
    /// call, flag lower, outcome settle. Returns the established session on
    /// success so the caller can transition screens.
    pub async fn submit_password(&mut self, credentials: &Credentials) -> Option<Session> {
        if self.password_in_flight {
            return None;
        }

        self.status.clear();
        if let Err(message) = credentials.validate() {
            self.status.set(message, StatusKind::Failed);
            return None;
        }

        self.password_in_flight = true;
        let outcome = self.client.sign_in(credentials).await;
        self.password_in_flight = false;

        self.settle(outcome)
    }

    /// Delegated-path submission, keyed off its own in-flight flag.
    pub async fn submit_with_provider<P: IdentityProvider>(
        &mut self,
        provider: &P,
        config: &ProviderConfig,
    ) -> Option<Session> {
        if self.provider_in_flight {
            return None;
        }

        self.status.clear();

        self.provider_in_flight = true;
        let outcome = self.client.sign_in_with_provider(provider, config).await;
        self.provider_in_flight = false;

        self.settle(outcome)
    }

    /// Converts a settled outcome into the status write and, on success,
    /// runs the success policy.
    fn settle(&mut self, outcome: SubmissionOutcome) -> Option<Session> {
        match outcome {
            SubmissionOutcome::Success { session, message } => {
                self.status.set(message, StatusKind::Success);
                if self.policy == SuccessPolicy::Persist
                    && let Err(err) = self.store.persist(&session)
                {
                    tracing::warn!(error = %err, "failed to persist session");
                    self.status.set(MSG_PERSIST_FAILED, StatusKind::Failed);
                    return None;
                }
                Some(session)
            }
            SubmissionOutcome::Rejected(message) => {
                self.status.set(message, StatusKind::Failed);
                None
            }
            SubmissionOutcome::TransportError(message) => {
                self.status.set(message, StatusKind::Failed);
                None
            }
            SubmissionOutcome::Cancelled => {
                self.status.set(MSG_GOOGLE_CANCELLED, StatusKind::Failed);
                None
            }
        }
    }

    /// Last reported status, read by the presentation layer on every render.
    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// Whether the password path is in flight (disables its submit control).
    pub fn password_in_flight(&self) -> bool {
        self.password_in_flight
    }

    /// Whether the delegated path is in flight.
    pub fn provider_in_flight(&self) -> bool {
        self.provider_in_flight
    }

    /// The session store owned by the flow.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::provider::{ProviderSignIn, ProviderUser};
    use crate::auth::{MSG_FILL_ALL_FIELDS, MSG_GOOGLE_SUCCESS, MSG_NETWORK_ERROR};
    use crate::session::{FileStorage, Storage};

    fn flow_for(server: &MockServer, dir: &tempfile::TempDir, policy: SuccessPolicy) -> LoginFlow {
        let client = AuthClient::new(format!("{}/user/signin", server.uri()));
        let storage = FileStorage::new(dir.path().join("session.json"));
        let store = SessionStore::with_storage(Box::new(storage)).unwrap();
        LoginFlow::new(client, store, policy)
    }

    fn success_body() -> serde_json::Value {
        serde_json::json!({
            "status": "SUCCESS",
            "message": "ok",
            "data": [{"email": "a@b.com"}],
        })
    }

    async fn mount_success(server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(server)
            .await;
    }

    struct StubProvider {
        result: fn() -> anyhow::Result<ProviderSignIn>,
    }

    impl IdentityProvider for StubProvider {
        async fn log_in(&self, _config: &ProviderConfig) -> anyhow::Result<ProviderSignIn> {
            (self.result)()
        }
    }

    fn provider_config() -> ProviderConfig {
        ProviderConfig::new("", "android-id")
    }

    /// Test: invalid credentials never reach the network, the flag never
    /// raises, and the fixed validation message is reported.
    #[tokio::test]
    async fn test_empty_fields_short_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        let session = flow.submit_password(&Credentials::new("", "x")).await;
        assert!(session.is_none());
        assert!(!flow.password_in_flight());

        let status = flow.status().current().unwrap();
        assert_eq!(status.text, MSG_FILL_ALL_FIELDS);
        assert_eq!(status.kind, StatusKind::Failed);
    }

    /// Test: the success scenario — status carries the server text, the
    /// store holds data[0], and the flag is lowered.
    #[tokio::test]
    async fn test_password_success_persists() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        let session = flow
            .submit_password(&Credentials::new("a@b.com", "x"))
            .await
            .expect("login should succeed");
        assert_eq!(session.get("email").unwrap(), "a@b.com");

        let status = flow.status().current().unwrap();
        assert_eq!(status.text, "ok");
        assert_eq!(status.kind, StatusKind::Success);

        assert!(!flow.password_in_flight());
        assert_eq!(flow.store().current(), Some(&session));
    }

    /// Test: rejection reports the server message verbatim and writes
    /// nothing to storage.
    #[tokio::test]
    async fn test_password_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "FAILED",
                "message": "bad password",
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        let session = flow.submit_password(&Credentials::new("a@b.com", "x")).await;
        assert!(session.is_none());

        let status = flow.status().current().unwrap();
        assert_eq!(status.text, "bad password");
        assert_eq!(status.kind, StatusKind::Failed);

        assert!(!flow.password_in_flight());
        assert!(flow.store().current().is_none());
        assert!(!dir.path().join("session.json").exists());
    }

    /// Test: transport failure reports the fixed generic message and the
    /// path stays re-triggerable.
    #[tokio::test]
    async fn test_password_transport_error_then_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        let credentials = Credentials::new("a@b.com", "x");
        assert!(flow.submit_password(&credentials).await.is_none());
        let status = flow.status().current().unwrap();
        assert_eq!(status.text, MSG_NETWORK_ERROR);
        assert_eq!(status.kind, StatusKind::Failed);
        assert!(!flow.password_in_flight());

        // Same path, new attempt: no in-flight residue blocks it.
        server.reset().await;
        mount_success(&server).await;
        assert!(flow.submit_password(&credentials).await.is_some());
        assert_eq!(flow.status().current().unwrap().kind, StatusKind::Success);
    }

    /// Test: a raised flag makes resubmission through the same path a no-op.
    #[tokio::test]
    async fn test_in_flight_guard_blocks_reentry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        flow.password_in_flight = true;
        let session = flow.submit_password(&Credentials::new("a@b.com", "x")).await;
        assert!(session.is_none());
        assert!(flow.status().current().is_none());

        flow.provider_in_flight = true;
        let provider = StubProvider {
            result: || Ok(ProviderSignIn::Cancelled),
        };
        let session = flow.submit_with_provider(&provider, &provider_config()).await;
        assert!(session.is_none());
        assert!(flow.status().current().is_none());
    }

    /// Test: Handoff variant returns the session without touching storage.
    #[tokio::test]
    async fn test_handoff_skips_persistence() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Handoff);

        let session = flow
            .submit_password(&Credentials::new("a@b.com", "x"))
            .await
            .expect("login should succeed");
        assert_eq!(session.get("email").unwrap(), "a@b.com");
        assert!(flow.store().current().is_none());
        assert!(!dir.path().join("session.json").exists());
    }

    /// Storage that rejects writes; used to force a persist failure.
    struct FailingStorage;

    impl Storage for FailingStorage {
        fn set_item(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        fn get_item(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn remove_item(&self, _key: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    /// Test: a persist failure overwrites the success status with the fixed
    /// persist message and yields no session.
    #[tokio::test]
    async fn test_persist_failure_overwrites_status() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let client = AuthClient::new(format!("{}/user/signin", server.uri()));
        let store = SessionStore::with_storage(Box::new(FailingStorage)).unwrap();
        let mut flow = LoginFlow::new(client, store, SuccessPolicy::Persist);

        let session = flow.submit_password(&Credentials::new("a@b.com", "x")).await;
        assert!(session.is_none());

        let status = flow.status().current().unwrap();
        assert_eq!(status.text, MSG_PERSIST_FAILED);
        assert_eq!(status.kind, StatusKind::Failed);
        assert!(flow.store().current().is_none());
        assert!(!flow.password_in_flight());
    }

    /// Test: provider success persists the adapted profile and reports the
    /// Google success text.
    #[tokio::test]
    async fn test_provider_success() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        let provider = StubProvider {
            result: || {
                Ok(ProviderSignIn::Success {
                    user: ProviderUser {
                        email: "a@b.com".to_string(),
                        name: "Ada".to_string(),
                        photo_url: "https://example.com/p.png".to_string(),
                    },
                })
            },
        };
        let session = flow
            .submit_with_provider(&provider, &provider_config())
            .await
            .expect("provider login should succeed");
        assert_eq!(session.get("name").unwrap(), "Ada");

        let status = flow.status().current().unwrap();
        assert_eq!(status.text, MSG_GOOGLE_SUCCESS);
        assert_eq!(status.kind, StatusKind::Success);
        assert_eq!(flow.store().current(), Some(&session));
        assert!(!flow.provider_in_flight());
    }

    /// Test: provider cancellation reports the fixed message as FAILED and
    /// lowers the flag.
    #[tokio::test]
    async fn test_provider_cancelled() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        let provider = StubProvider {
            result: || Ok(ProviderSignIn::Cancelled),
        };
        let session = flow.submit_with_provider(&provider, &provider_config()).await;
        assert!(session.is_none());

        let status = flow.status().current().unwrap();
        assert_eq!(status.text, MSG_GOOGLE_CANCELLED);
        assert_eq!(status.kind, StatusKind::Failed);
        assert!(!flow.provider_in_flight());
        assert!(flow.store().current().is_none());
    }

    /// Test: the two paths share the single status slot; the most recent
    /// settle wins.
    #[tokio::test]
    async fn test_paths_share_status_slot() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut flow = flow_for(&server, &dir, SuccessPolicy::Persist);

        flow.submit_password(&Credentials::new("a@b.com", "x")).await;
        assert_eq!(flow.status().current().unwrap().text, "ok");

        let provider = StubProvider {
            result: || Ok(ProviderSignIn::Cancelled),
        };
        flow.submit_with_provider(&provider, &provider_config()).await;
        assert_eq!(flow.status().current().unwrap().text, MSG_GOOGLE_CANCELLED);
    }
}
