//! Error types for the session layer.

use std::time::Duration;

use hotspot_protocol::{CommandError, ProtocolError};
use hotspot_transport::TransportError;

use crate::SessionState;

/// Errors that can occur while connecting, logging in, or running commands.
///
/// Everything except [`SessionError::Command`] leaves the session unusable:
/// callers that want to retry must open a fresh session. The exceptions are
/// a `!trap` command error and [`ProtocolError::EmptyWord`], which is
/// caught before anything is sent.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `connect` was called with an empty credential list.
    #[error("no credentials supplied")]
    NoCredentials,

    /// The router rejected every credential that was tried.
    #[error("authentication failed for {peer} (tried: {})", .attempted.join(", "))]
    Authentication {
        /// The router that was contacted.
        peer: String,
        /// Usernames tried, in order.
        attempted: Vec<String>,
    },

    /// The session is not in a state that accepts commands.
    ///
    /// Returned without touching the wire, so a broken session fails fast
    /// instead of hanging on a dead socket.
    #[error("session is {0}, not ready for commands")]
    Unusable(SessionState),

    /// The connection failed (connect, send, receive, or peer closed).
    #[error(transparent)]
    Connection(#[from] TransportError),

    /// The router did not answer within the I/O deadline.
    #[error("router did not answer within {0:?}")]
    Timeout(Duration),

    /// The byte stream could not be framed.
    #[error(transparent)]
    Protocol(ProtocolError),

    /// The router answered with `!trap` or `!fatal`.
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl SessionError {
    /// Returns `true` if the error came from the router refusing a command
    /// rather than from the session itself.
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command(e) if !e.is_fatal())
    }

    /// Returns the router's command error, if this is one.
    pub fn as_command(&self) -> Option<&CommandError> {
        match self {
            Self::Command(e) => Some(e),
            _ => None,
        }
    }
}

/// Lifts framing failures into the session taxonomy so callers can tell a
/// dead connection from a timeout from stream corruption.
impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Transport(e) => Self::Connection(e),
            ProtocolError::Timeout(d) => Self::Timeout(d),
            other => Self::Protocol(other),
        }
    }
}
