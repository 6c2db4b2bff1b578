//! Sentences: ordered words terminated by a zero-length word.
//!
//! A command is one sentence; a reply is a stream of sentences, each
//! starting with a `!` tag word. This module only frames words on and off
//! the wire: it doesn't interpret them.

use std::fmt;
use std::time::Duration;

use hotspot_transport::Connection;
use serde::{Deserialize, Serialize};

use crate::length::{encode_length, encoded_size, read_length};
use crate::{ProtocolError, ReplyTag};

/// Sanity limits applied while reading sentences.
///
/// These are corruption guards, not protocol features: a peer that
/// announces a 2 GiB word or never sends a terminator is broken, and the
/// session should be torn down instead of allocating or looping forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLimits {
    /// Largest word length accepted, in bytes.
    pub max_word_len: u32,

    /// Largest number of words accepted in one sentence.
    pub max_words: usize,

    /// Largest number of sentences accepted in one reply.
    pub max_sentences: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_word_len: 1 << 20,
            max_words: 4096,
            max_sentences: 65_536,
        }
    }
}

/// One protocol sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<String>,
}

impl Sentence {
    /// Creates a sentence from its words.
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    /// The words in order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Consumes the sentence, returning its words.
    pub fn into_words(self) -> Vec<String> {
        self.words
    }

    /// The first word, if any.
    pub fn first(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    /// The reply tag carried by the first word, if it is one.
    pub fn tag(&self) -> Option<ReplyTag> {
        self.first().and_then(ReplyTag::parse)
    }

    /// Returns `true` for a bare terminator with no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of words in the sentence.
    pub fn len(&self) -> usize {
        self.words.len()
    }
}

impl From<Vec<String>> for Sentence {
    fn from(words: Vec<String>) -> Self {
        Self::new(words)
    }
}

impl<S: Into<String>> FromIterator<S> for Sentence {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.words.join(" "))
    }
}

/// Encodes `words` followed by the zero-length terminator.
///
/// # Errors
/// [`ProtocolError::EmptyWord`] if any word is empty. Nothing is encoded in
/// that case.
pub fn encode_sentence<W: AsRef<str>>(words: &[W]) -> Result<Vec<u8>, ProtocolError> {
    let mut lens = Vec::with_capacity(words.len());
    let mut total = 1;
    for (index, word) in words.iter().enumerate() {
        let bytes = word.as_ref().as_bytes();
        if bytes.is_empty() {
            return Err(ProtocolError::EmptyWord { index });
        }
        let len = u32::try_from(bytes.len()).map_err(|_| ProtocolError::WordTooLong {
            len: u32::MAX,
            max: u32::MAX,
        })?;
        total += encoded_size(len) + bytes.len();
        lens.push(len);
    }

    let mut out = Vec::with_capacity(total);
    for (word, len) in words.iter().zip(lens) {
        encode_length(len, &mut out);
        out.extend_from_slice(word.as_ref().as_bytes());
    }
    encode_length(0, &mut out);
    Ok(out)
}

/// Writes one sentence to `conn` in a single send.
pub async fn write_sentence<C, W>(conn: &C, words: &[W]) -> Result<(), ProtocolError>
where
    C: Connection,
    W: AsRef<str>,
{
    let bytes = encode_sentence(words)?;
    tracing::trace!(
        id = %conn.id(),
        words = words.len(),
        command = words.first().map(|w| w.as_ref()).unwrap_or(""),
        "-> sentence"
    );
    conn.send(&bytes).await?;
    Ok(())
}

/// Reads one sentence from `conn`.
///
/// Returns an empty [`Sentence`] when the peer sent a bare terminator.
pub async fn read_sentence<C: Connection>(
    conn: &C,
    limits: &FrameLimits,
) -> Result<Sentence, ProtocolError> {
    let mut words = Vec::new();
    loop {
        let len = read_length(conn).await?;
        if len == 0 {
            break;
        }
        if len > limits.max_word_len {
            return Err(ProtocolError::WordTooLong {
                len,
                max: limits.max_word_len,
            });
        }
        if words.len() >= limits.max_words {
            return Err(ProtocolError::TooManyWords {
                max: limits.max_words,
            });
        }
        let mut buf = vec![0u8; len as usize];
        conn.recv_exact(&mut buf).await?;
        words.push(into_word(buf));
    }

    let sentence = Sentence::new(words);
    tracing::trace!(id = %conn.id(), %sentence, "<- sentence");
    Ok(sentence)
}

/// Like [`read_sentence`], but gives up after `deadline`.
///
/// A timed-out read may have consumed part of a sentence, so the
/// connection must not be reused afterwards.
pub async fn read_sentence_within<C: Connection>(
    conn: &C,
    limits: &FrameLimits,
    deadline: Duration,
) -> Result<Sentence, ProtocolError> {
    tokio::time::timeout(deadline, read_sentence(conn, limits))
        .await
        .map_err(|_| ProtocolError::Timeout(deadline))?
}

/// Router comments can carry non-UTF-8 text (legacy code pages), so
/// undecodable bytes are replaced rather than failing the whole reply.
fn into_word(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(word) => word,
        Err(e) => {
            tracing::debug!("word is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use hotspot_transport::StreamConnection;
    use tokio::io::DuplexStream;

    use super::*;

    fn pipe() -> (StreamConnection<DuplexStream>, StreamConnection<DuplexStream>) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        (StreamConnection::new(a), StreamConnection::new(b))
    }

    #[test]
    fn test_encode_sentence_layout() {
        let bytes = encode_sentence(&["/login", "=name=admin"]).unwrap();
        let mut expected = vec![6];
        expected.extend_from_slice(b"/login");
        expected.push(11);
        expected.extend_from_slice(b"=name=admin");
        expected.push(0);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_encode_sentence_empty_word_is_rejected() {
        let result = encode_sentence(&["/ip/dns/static/print", "", "?name=portal"]);
        assert!(matches!(result, Err(ProtocolError::EmptyWord { index: 1 })));
    }

    #[tokio::test]
    async fn test_write_sentence_empty_word_sends_nothing() {
        let (client, router) = pipe();

        let result = write_sentence(&client, &["/ip/hotspot/user/print", ""]).await;
        assert!(matches!(result, Err(ProtocolError::EmptyWord { index: 1 })));

        // The next sentence is the first thing the peer sees.
        write_sentence(&client, &["/system/identity/print"]).await.unwrap();
        let sentence = read_sentence(&router, &FrameLimits::default()).await.unwrap();
        assert_eq!(sentence.words(), ["/system/identity/print"]);
    }

    #[test]
    fn test_encode_sentence_empty_is_bare_terminator() {
        let words: [&str; 0] = [];
        assert_eq!(encode_sentence(&words).unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_write_then_read_sentence_round_trip() {
        let (client, router) = pipe();
        let words = vec!["/hotspot/user/add", "=name=room5-12", "=password=8841"];

        write_sentence(&client, &words).await.unwrap();
        let sentence = read_sentence(&router, &FrameLimits::default()).await.unwrap();

        assert_eq!(sentence.words(), words.as_slice());
        assert_eq!(sentence.first(), Some("/hotspot/user/add"));
    }

    #[tokio::test]
    async fn test_read_sentence_long_word_uses_multi_byte_prefix() {
        let (client, router) = pipe();
        let long = "x".repeat(0x4000 + 3);

        write_sentence(&client, &[long.as_str()]).await.unwrap();
        let sentence = read_sentence(&router, &FrameLimits::default()).await.unwrap();

        assert_eq!(sentence.len(), 1);
        assert_eq!(sentence.words()[0].len(), long.len());
    }

    #[tokio::test]
    async fn test_read_sentence_bare_terminator_is_empty() {
        let (client, router) = pipe();
        client.send(&[0]).await.unwrap();

        let sentence = read_sentence(&router, &FrameLimits::default()).await.unwrap();
        assert!(sentence.is_empty());
    }

    #[tokio::test]
    async fn test_read_sentence_oversized_word_is_rejected() {
        let (client, router) = pipe();
        let limits = FrameLimits {
            max_word_len: 8,
            ..FrameLimits::default()
        };
        write_sentence(&client, &["123456789"]).await.unwrap();

        let result = read_sentence(&router, &limits).await;
        assert!(matches!(
            result,
            Err(ProtocolError::WordTooLong { len: 9, max: 8 })
        ));
    }

    #[tokio::test]
    async fn test_read_sentence_unterminated_stream_hits_word_limit() {
        let (client, router) = pipe();
        let limits = FrameLimits {
            max_words: 3,
            ..FrameLimits::default()
        };
        // Four words, no terminator anywhere.
        let mut bytes = Vec::new();
        for _ in 0..4 {
            bytes.extend_from_slice(&[1, b'a']);
        }
        client.send(&bytes).await.unwrap();

        let result = read_sentence(&router, &limits).await;
        assert!(matches!(result, Err(ProtocolError::TooManyWords { max: 3 })));
    }

    #[tokio::test]
    async fn test_read_sentence_invalid_utf8_is_decoded_lossily() {
        let (client, router) = pipe();
        client.send(&[3, b'=', 0xFF, b'x', 0]).await.unwrap();

        let sentence = read_sentence(&router, &FrameLimits::default()).await.unwrap();
        assert_eq!(sentence.words()[0], "=\u{FFFD}x");
    }

    #[tokio::test]
    async fn test_read_sentence_within_times_out_on_silent_peer() {
        let (_client, router) = pipe();

        let result = read_sentence_within(
            &router,
            &FrameLimits::default(),
            Duration::from_millis(50),
        )
        .await;

        assert!(matches!(result, Err(ProtocolError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_read_sentence_closed_peer_is_transport_error() {
        let (client, router) = pipe();
        client.send(&[5, b'a']).await.unwrap();
        client.close().await.unwrap();
        drop(client);

        let result = read_sentence(&router, &FrameLimits::default()).await;
        assert!(matches!(result, Err(ProtocolError::Transport(_))));
    }

    #[test]
    fn test_sentence_tag_reads_first_word() {
        let sentence: Sentence = ["!re", "=name=alice"].into_iter().collect();
        assert_eq!(sentence.tag(), Some(ReplyTag::Re));

        let command: Sentence = ["/hotspot/user/print"].into_iter().collect();
        assert_eq!(command.tag(), None);
    }
}
