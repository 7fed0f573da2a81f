//! Authentication and session establishment.
//!
//! Credential submission, remote-call result interpretation, and user-facing
//! status reporting. The [`flow::LoginFlow`] state machine orchestrates the
//! validator, the remote client, and the session store; the presentation
//! layer only triggers submissions and renders the reported status.

pub mod client;
pub mod credentials;
pub mod flow;
pub mod google;
pub mod provider;
pub mod status;

use crate::session::Session;

/// Result of one submission attempt, produced exactly once per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Authentication succeeded; carries the session record and the
    /// user-facing success text.
    Success { session: Session, message: String },
    /// The server rejected the credentials; the message is server-authored
    /// and shown verbatim.
    Rejected(String),
    /// Network, HTTP, or response-shape failure; the message is a fixed
    /// generic string and the underlying cause is logged only.
    TransportError(String),
    /// The user aborted the delegated sign-in.
    Cancelled,
}

/// Shown when either credential field is empty.
pub const MSG_FILL_ALL_FIELDS: &str = "Please fill in all fields";

/// Fixed generic text for transport-level failures; the cause is never
/// shown to the user.
pub const MSG_NETWORK_ERROR: &str = "An error occurred. Check your network and try again";

/// Success text for the delegated Google path.
pub const MSG_GOOGLE_SUCCESS: &str = "Google signin successful";

/// Shown when the user aborts the delegated Google path.
pub const MSG_GOOGLE_CANCELLED: &str = "Google Signin was cancelled";

/// Shown when the session could not be written to durable storage.
pub const MSG_PERSIST_FAILED: &str = "Persisting login failed";
