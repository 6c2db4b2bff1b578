//! Error types for the directory layer.

use hotspot_session::SessionError;

use crate::store::StoreError;

/// Errors that can occur during hotspot directory operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The session failed: connection, timeout, framing, or a command the
    /// router refused outside of create/remove/update.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The router refused to create the account.
    #[error("router refused to create account {name}: {message}")]
    Create { name: String, message: String },

    /// The router refused to remove an account or active session.
    #[error("router refused to remove {name}: {message}")]
    Remove { name: String, message: String },

    /// The router refused to change an account.
    #[error("router refused to update account {name}: {message}")]
    Update { name: String, message: String },

    /// The router accepted a change but a re-query shows it had no effect.
    #[error("change to {name} was accepted but did not take effect")]
    Verification { name: String },

    /// The guest store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DirectoryError {
    /// Maps a refused command into the variant built by `refused`, leaving
    /// every other session failure as [`DirectoryError::Session`].
    ///
    /// A `!fatal` stays a session failure: the router ended the session,
    /// it didn't judge the request.
    pub(crate) fn from_refusal(
        err: SessionError,
        refused: impl FnOnce(String) -> Self,
    ) -> Self {
        match err {
            SessionError::Command(e) if !e.is_fatal() => refused(e.message),
            other => Self::Session(other),
        }
    }
}
