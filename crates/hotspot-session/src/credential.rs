//! Router login credentials.
//!
//! Routers in the field don't always share the same API account, so a
//! session can be given several credentials to try in order. The list is
//! always supplied by the caller; nothing here guesses defaults.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A username/password pair for the router API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// API username.
    pub username: String,

    /// API password. An empty password is sent as no password word at all.
    #[serde(default)]
    pub password: String,
}

impl Credential {
    /// Creates a credential.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns `true` if no password is set.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

/// Hides the password so credentials can be logged safely.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &if self.has_password() { "<redacted>" } else { "" })
            .finish()
    }
}
