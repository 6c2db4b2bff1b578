//! Wire protocol for the router API.
//!
//! This crate defines the "language" the client and the router speak:
//!
//! - **Length codec** ([`length`]): the 1 to 5 byte variable-width
//!   prefix written before every word.
//! - **Sentences** ([`Sentence`], [`read_sentence`], [`write_sentence`]):
//!   ordered words ended by a zero-length word.
//! - **Replies** ([`ReplyTag`], [`Record`], [`parse_words`]): tagged
//!   reply sentences turned into attribute records.
//! - **Errors** ([`ProtocolError`], [`CommandError`]): framing failures
//!   versus router-reported command failures.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (login and command execution). It doesn't know about credentials or
//! hotspot accounts; it only frames and parses.
//!
//! ```text
//! Transport (bytes) → Protocol (sentences, records) → Session (commands)
//! ```

pub mod length;
mod error;
mod reply;
mod sentence;
mod words;

pub use error::ProtocolError;
pub use reply::{
    CommandError, Record, Reply, ReplyStream, ReplyTag, parse_sentences, parse_words,
};
pub use sentence::{
    FrameLimits, Sentence, encode_sentence, read_sentence, read_sentence_within,
    write_sentence,
};
pub use words::{attr, query, query_match, split_attr};
