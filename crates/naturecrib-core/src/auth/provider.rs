//! Identity-provider seam for delegated sign-in.

use anyhow::Result;
use serde_json::json;

use crate::session::Session;

/// Scopes requested from the identity provider. Fixed by the auth flow.
pub const SCOPES: [&str; 2] = ["profile", "email"];

/// Provider configuration: the public client identifiers registered for
/// each platform plus the fixed scope set.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub ios_client_id: String,
    pub android_client_id: String,
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    pub fn new(ios_client_id: impl Into<String>, android_client_id: impl Into<String>) -> Self {
        Self {
            ios_client_id: ios_client_id.into(),
            android_client_id: android_client_id.into(),
            scopes: SCOPES.iter().map(ToString::to_string).collect(),
        }
    }

    /// The client id used for the desktop flow: the android id when
    /// configured, the ios id otherwise. Returns `None` when neither is set.
    pub fn client_id(&self) -> Option<&str> {
        [&self.android_client_id, &self.ios_client_id]
            .into_iter()
            .find(|id| !id.is_empty())
            .map(String::as_str)
    }

    /// Space-separated scope parameter for the authorization request.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Minimal profile subset extracted from a successful provider sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub email: String,
    pub name: String,
    pub photo_url: String,
}

impl ProviderUser {
    /// Adapts the profile to the session shape, under the field names the
    /// rest of the app reads (`email`, `name`, `photoUrl`).
    pub fn into_session(self) -> Session {
        let mut map = serde_json::Map::new();
        map.insert("email".to_string(), json!(self.email));
        map.insert("name".to_string(), json!(self.name));
        map.insert("photoUrl".to_string(), json!(self.photo_url));
        Session(map)
    }
}

/// Settled result of one delegated sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSignIn {
    Success { user: ProviderUser },
    Cancelled,
}

/// A third-party identity provider the manager can delegate to.
///
/// Errors are provider-level transport failures; user aborts settle as
/// `ProviderSignIn::Cancelled`, not as errors.
pub trait IdentityProvider {
    fn log_in(
        &self,
        config: &ProviderConfig,
    ) -> impl std::future::Future<Output = Result<ProviderSignIn>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: android client id preferred, ios as fallback, none when empty.
    #[test]
    fn test_client_id_selection() {
        let both = ProviderConfig::new("ios-id", "android-id");
        assert_eq!(both.client_id(), Some("android-id"));

        let ios_only = ProviderConfig::new("ios-id", "");
        assert_eq!(ios_only.client_id(), Some("ios-id"));

        let neither = ProviderConfig::new("", "");
        assert_eq!(neither.client_id(), None);
    }

    /// Test: the fixed scope set.
    #[test]
    fn test_scope_param() {
        let config = ProviderConfig::new("", "");
        assert_eq!(config.scope_param(), "profile email");
    }

    /// Test: profile adapts to the session field names.
    #[test]
    fn test_profile_into_session() {
        let session = ProviderUser {
            email: "a@b.com".to_string(),
            name: "Ada".to_string(),
            photo_url: "https://example.com/p.png".to_string(),
        }
        .into_session();

        assert_eq!(session.get("email").unwrap(), "a@b.com");
        assert_eq!(session.get("name").unwrap(), "Ada");
        assert_eq!(session.get("photoUrl").unwrap(), "https://example.com/p.png");
    }
}
