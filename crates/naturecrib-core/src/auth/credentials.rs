//! Credential capture and validation.

use serde::Serialize;

use super::MSG_FILL_ALL_FIELDS;

/// Email + password pair as entered by the user.
///
/// Ephemeral: created for one submission attempt and discarded afterwards,
/// never persisted by the manager. The field names are the wire names of the
/// sign-in request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Email address identifying the account.
    pub identifier: String,
    /// Password.
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Checks that both fields are filled in.
    ///
    /// Only strict equality with the empty string fails; there is no
    /// trimming and no email-format check. Runs before any network call.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.identifier.is_empty() || self.secret.is_empty() {
            return Err(MSG_FILL_ALL_FIELDS);
        }
        Ok(())
    }
}
