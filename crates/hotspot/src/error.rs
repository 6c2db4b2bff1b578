//! Unified error type for the hotspot client.

use hotspot_directory::{DirectoryError, StoreError};
use hotspot_protocol::ProtocolError;
use hotspot_session::SessionError;
use hotspot_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps every layer's error.
///
/// Callers using the `hotspot` crate match on this one type; `?` converts
/// layer errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum HotspotError {
    /// Connect, send, or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The byte stream could not be framed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Login, timeout, or a refused command.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A hotspot account operation failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The guest store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration is unreadable or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HotspotError {
    /// Returns `true` if the router rejected every credential.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::Authentication { .. })
                | Self::Directory(DirectoryError::Session(SessionError::Authentication { .. }))
        )
    }
}
