//! One request/reply exchange on a raw connection.
//!
//! Shared by the login handshake (before a [`Session`](crate::Session)
//! exists) and by [`Session::execute`](crate::Session::execute).

use std::time::Duration;

use hotspot_protocol::{
    FrameLimits, ProtocolError, ReplyStream, ReplyTag, read_sentence_within, write_sentence,
};
use hotspot_transport::{Connection, TransportError};

/// Sends `words` as one sentence and reads the complete reply stream.
pub(crate) async fn exchange<C, W>(
    conn: &C,
    words: &[W],
    limits: &FrameLimits,
    io_timeout: Duration,
) -> Result<ReplyStream, ProtocolError>
where
    C: Connection,
    W: AsRef<str>,
{
    tokio::time::timeout(io_timeout, write_sentence(conn, words))
        .await
        .map_err(|_| ProtocolError::Timeout(io_timeout))??;
    read_reply(conn, limits, io_timeout).await
}

/// Reads sentences until a terminal tag.
///
/// Each sentence gets its own deadline, so a long listing that keeps
/// streaming is fine while a silent router is not. A reply longer than
/// [`FrameLimits::max_sentences`] is treated as a runaway peer. If the router closes
/// the connection right after a `!trap` (no `!done`), the trap is still
/// returned, with [`ReplyTag::Trap`] as the terminal tag.
pub(crate) async fn read_reply<C: Connection>(
    conn: &C,
    limits: &FrameLimits,
    io_timeout: Duration,
) -> Result<ReplyStream, ProtocolError> {
    let mut sentences = Vec::new();
    let mut saw_trap = false;
    loop {
        let sentence = match read_sentence_within(conn, limits, io_timeout).await {
            Ok(sentence) => sentence,
            Err(ProtocolError::Transport(TransportError::ConnectionClosed(reason)))
                if saw_trap =>
            {
                tracing::debug!(id = %conn.id(), %reason, "connection closed after !trap");
                return Ok(ReplyStream::new(sentences, ReplyTag::Trap));
            }
            Err(e) => return Err(e),
        };

        let Some(tag) = sentence.tag() else {
            return Err(ProtocolError::UnexpectedReply(
                sentence.first().unwrap_or_default().to_string(),
            ));
        };
        saw_trap |= tag == ReplyTag::Trap;
        if sentences.len() >= limits.max_sentences {
            return Err(ProtocolError::TooManySentences {
                max: limits.max_sentences,
            });
        }
        sentences.push(sentence);
        if tag.is_terminal() {
            return Ok(ReplyStream::new(sentences, tag));
        }
    }
}
