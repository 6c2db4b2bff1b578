//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` means the byte stream itself could not be framed or
//! read: the session it came from is no longer usable.

use std::time::Duration;

use hotspot_transport::TransportError;

/// Errors that can occur while framing or reading sentences.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The first byte of a length prefix uses a reserved pattern.
    ///
    /// Control bytes `0xF8..=0xFF`, and `0xF1..=0xF7` where only `0xF0`
    /// is defined, never start a valid length.
    #[error("invalid length prefix byte {0:#04x}")]
    InvalidLengthPrefix(u8),

    /// A word declared a length above the configured sanity ceiling.
    ///
    /// Treated as stream corruption rather than a legitimately large
    /// payload.
    #[error("word length {len} exceeds limit of {max} bytes")]
    WordTooLong { len: u32, max: u32 },

    /// A sentence kept going past the configured word limit.
    #[error("sentence exceeds {max} words")]
    TooManyWords { max: usize },

    /// A reply kept streaming sentences past the configured limit without
    /// reaching a terminal tag.
    #[error("reply exceeds {max} sentences")]
    TooManySentences { max: usize },

    /// An outgoing word was empty.
    ///
    /// A zero-length word is the sentence terminator on the wire, so the
    /// words after it would reach the router as a separate command.
    #[error("word {index} of the sentence is empty")]
    EmptyWord { index: usize },

    /// A reply sentence did not start with a `!` tag word.
    #[error("unexpected reply sentence starting with {0:?}")]
    UnexpectedReply(String),

    /// No sentence arrived within the read deadline.
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    /// The underlying connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
