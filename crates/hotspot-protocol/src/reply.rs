//! Reply parsing: from tagged sentences to attribute records.
//!
//! Every reply sentence starts with a tag word:
//!
//! ```text
//! !re     one result record follows
//! !done   command finished (may carry attributes, e.g. =ret=*1A)
//! !trap   command-level error; a !done still follows on the wire
//! !fatal  session-level error; the router closes the connection
//! !empty  the command produced no records (newer firmware)
//! ```
//!
//! Attribute words (`=key=value`) between two tags belong to the record
//! opened by the first tag. The parser is schema-agnostic: every key is
//! kept verbatim and callers project the ones they need.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::words::split_attr;
use crate::Sentence;

// ---------------------------------------------------------------------------
// ReplyTag
// ---------------------------------------------------------------------------

/// The tag that opens a reply sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyTag {
    /// `!re`
    Re,
    /// `!done`
    Done,
    /// `!trap`
    Trap,
    /// `!fatal`
    Fatal,
    /// `!empty`
    Empty,
}

impl ReplyTag {
    /// Parses a tag word. Returns `None` for anything else.
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "!re" => Some(Self::Re),
            "!done" => Some(Self::Done),
            "!trap" => Some(Self::Trap),
            "!fatal" => Some(Self::Fatal),
            "!empty" => Some(Self::Empty),
            _ => None,
        }
    }

    /// The wire form of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Re => "!re",
            Self::Done => "!done",
            Self::Trap => "!trap",
            Self::Fatal => "!fatal",
            Self::Empty => "!empty",
        }
    }

    /// Returns `true` for tags that end a reply stream.
    ///
    /// `!trap` is not terminal: the router still sends `!done` after it.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Fatal)
    }
}

impl fmt::Display for ReplyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One result record: attribute name to value.
///
/// Backed by a `BTreeMap` so records print and serialize in a stable
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The router-assigned id (`.id`), e.g. `*1A`.
    pub fn id(&self) -> Option<&str> {
        self.get(".id")
    }

    /// The `name` attribute.
    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    /// Reads a `true`/`false` attribute. Missing or other values are `None`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        }
    }

    /// Sets an attribute, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns `true` if the attribute is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the record has no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consumes the record, returning the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// The router refused a command (`!trap`) or dropped the session (`!fatal`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("router returned {tag}: {message}")]
pub struct CommandError {
    /// [`ReplyTag::Trap`] or [`ReplyTag::Fatal`].
    pub tag: ReplyTag,
    /// The router-supplied message, empty if none was sent.
    pub message: String,
    /// The trap `category` attribute, when present.
    pub category: Option<u32>,
}

impl CommandError {
    /// Returns `true` if the router ended the whole session.
    pub fn is_fatal(&self) -> bool {
        self.tag == ReplyTag::Fatal
    }
}

// ---------------------------------------------------------------------------
// Reply / ReplyStream
// ---------------------------------------------------------------------------

/// A successfully parsed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// One record per `!re` sentence, in arrival order.
    pub records: Vec<Record>,
    /// Attributes carried on the `!done` sentence.
    pub done: Record,
}

impl Reply {
    /// The `ret` attribute from `!done`, e.g. the id assigned by `add`.
    pub fn ret(&self) -> Option<&str> {
        self.done.get("ret")
    }
}

/// The raw sentences returned by one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyStream {
    sentences: Vec<Sentence>,
    terminal: ReplyTag,
}

impl ReplyStream {
    /// Creates a stream from the sentences read and the tag that ended it.
    pub fn new(sentences: Vec<Sentence>, terminal: ReplyTag) -> Self {
        Self { sentences, terminal }
    }

    /// All sentences, terminal one included.
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// The tag that ended the stream.
    pub fn terminal(&self) -> ReplyTag {
        self.terminal
    }

    /// Returns `true` if any sentence was a `!trap` or `!fatal`.
    pub fn has_error(&self) -> bool {
        self.sentences
            .iter()
            .any(|s| matches!(s.tag(), Some(ReplyTag::Trap | ReplyTag::Fatal)))
    }

    /// Runs the reply parser over the stream.
    pub fn parse(&self) -> Result<Reply, CommandError> {
        parse_sentences(&self.sentences)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parses the sentences of one reply stream.
pub fn parse_sentences(sentences: &[Sentence]) -> Result<Reply, CommandError> {
    parse_words(
        sentences
            .iter()
            .flat_map(|s| s.words().iter().map(String::as_str)),
    )
}

/// Parses a flat word stream, where every `!` tag opens a new sentence.
///
/// Attribute words are accumulated into the record opened by the most
/// recent tag. Parsing stops once a terminal tag's attributes have been
/// collected. A `!trap` or `!fatal` anywhere in the stream turns the whole
/// result into a [`CommandError`], even when no `!done` follows.
pub fn parse_words<'a, I>(words: I) -> Result<Reply, CommandError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parser = Parser::default();
    for word in words {
        if let Some(tag) = ReplyTag::parse(word) {
            if parser.current.is_some_and(ReplyTag::is_terminal) {
                break;
            }
            parser.flush();
            parser.current = Some(tag);
            continue;
        }

        if let Some((key, value)) = split_attr(word) {
            parser.attrs.insert(key, value);
        } else if let Some(tag_value) = word.strip_prefix(".tag=") {
            parser.attrs.insert(".tag", tag_value);
        } else {
            parser.bare.push(word.to_string());
        }
    }
    parser.flush();
    parser.finish()
}

#[derive(Default)]
struct Parser {
    current: Option<ReplyTag>,
    attrs: Record,
    bare: Vec<String>,
    records: Vec<Record>,
    done: Record,
    failure: Option<CommandError>,
}

impl Parser {
    /// Closes the sentence opened by `current`.
    fn flush(&mut self) {
        let attrs = std::mem::take(&mut self.attrs);
        let bare = std::mem::take(&mut self.bare);
        match self.current {
            Some(ReplyTag::Re) if !attrs.is_empty() => self.records.push(attrs),
            Some(ReplyTag::Done) => self.done = attrs,
            Some(tag @ (ReplyTag::Trap | ReplyTag::Fatal)) => {
                // The first error wins; a later !fatal upgrades a !trap.
                if self.failure.as_ref().is_none_or(|f| !f.is_fatal() && tag == ReplyTag::Fatal) {
                    self.failure = Some(failure_from(tag, &attrs, &bare));
                }
            }
            Some(_) => {}
            None if !attrs.is_empty() || !bare.is_empty() => {
                let words = attrs.len() + bare.len();
                tracing::debug!(words, "ignoring words before first reply tag");
            }
            None => {}
        }
    }

    fn finish(self) -> Result<Reply, CommandError> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(Reply {
                records: self.records,
                done: self.done,
            }),
        }
    }
}

fn failure_from(tag: ReplyTag, attrs: &Record, bare: &[String]) -> CommandError {
    let message = match attrs.get("message") {
        Some(message) => message.to_string(),
        None => bare.join(" "),
    };
    CommandError {
        tag,
        message,
        category: attrs.get("category").and_then(|c| c.parse().ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_words_two_records_and_done() {
        let reply = parse_words([
            "!re", "=name=alice", "=.id=*1", "!re", "=name=bob", "=.id=*2", "!done",
        ])
        .expect("should parse");

        assert_eq!(reply.records.len(), 2);
        assert_eq!(reply.records[0].name(), Some("alice"));
        assert_eq!(reply.records[0].id(), Some("*1"));
        assert_eq!(reply.records[1].name(), Some("bob"));
        assert_eq!(reply.records[1].id(), Some("*2"));
        assert!(reply.done.is_empty());
    }

    #[test]
    fn test_parse_words_trap_with_trailing_done_is_command_error() {
        let err = parse_words(["!trap", "=message=already exists", "!done"]).unwrap_err();
        assert_eq!(err.message, "already exists");
        assert_eq!(err.tag, ReplyTag::Trap);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_parse_words_trap_without_done_is_command_error() {
        let err = parse_words(["!trap", "=message=already exists"]).unwrap_err();
        assert_eq!(err.message, "already exists");
    }

    #[test]
    fn test_parse_words_trap_category_is_parsed() {
        let err = parse_words(["!trap", "=category=1", "=message=no such item", "!done"])
            .unwrap_err();
        assert_eq!(err.category, Some(1));
    }

    #[test]
    fn test_parse_words_trap_discards_partial_records() {
        let result = parse_words(["!re", "=name=alice", "!trap", "=message=interrupted", "!done"]);
        assert!(result.is_err(), "partial records must not be returned silently");
    }

    #[test]
    fn test_parse_words_fatal_uses_bare_words_as_message() {
        let err = parse_words(["!fatal", "session terminated on request"]).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.message, "session terminated on request");
    }

    #[test]
    fn test_parse_words_done_attributes_are_kept() {
        let reply = parse_words(["!done", "=ret=*1A"]).unwrap();
        assert!(reply.records.is_empty());
        assert_eq!(reply.ret(), Some("*1A"));
    }

    #[test]
    fn test_parse_words_stops_after_terminal_sentence() {
        let reply = parse_words(["!done", "!re", "=name=late"]).unwrap();
        assert!(reply.records.is_empty());
    }

    #[test]
    fn test_parse_words_empty_re_is_not_a_record() {
        let reply = parse_words(["!re", "!re", "=name=x", "!done"]).unwrap();
        assert_eq!(reply.records.len(), 1);
    }

    #[test]
    fn test_parse_words_empty_tag_yields_no_records() {
        let reply = parse_words(["!empty", "!done"]).unwrap();
        assert!(reply.records.is_empty());
    }

    #[test]
    fn test_parse_words_unknown_keys_are_preserved() {
        let reply = parse_words([
            "!re",
            "=.id=*5",
            "=name=room5-12",
            "=bytes-in=1024",
            "=x-vendor-field=42",
            ".tag=7",
            "!done",
        ])
        .unwrap();
        let record = &reply.records[0];
        assert_eq!(record.get("bytes-in"), Some("1024"));
        assert_eq!(record.get("x-vendor-field"), Some("42"));
        assert_eq!(record.get(".tag"), Some("7"));
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn test_parse_sentences_matches_flat_parse() {
        let sentences = vec![
            Sentence::from_iter(["!re", "=name=alice"]),
            Sentence::from_iter(["!done"]),
        ];
        let reply = parse_sentences(&sentences).unwrap();
        assert_eq!(reply.records[0].name(), Some("alice"));
    }

    #[test]
    fn test_reply_stream_reports_errors() {
        let stream = ReplyStream::new(
            vec![
                Sentence::from_iter(["!trap", "=message=failure"]),
                Sentence::from_iter(["!done"]),
            ],
            ReplyTag::Done,
        );
        assert!(stream.has_error());
        assert_eq!(stream.terminal(), ReplyTag::Done);
        assert_eq!(stream.parse().unwrap_err().message, "failure");
    }

    #[test]
    fn test_record_flag_parses_router_booleans() {
        let record: Record = [("disabled", "true"), ("dynamic", "no"), ("odd", "maybe")]
            .into_iter()
            .collect();
        assert_eq!(record.flag("disabled"), Some(true));
        assert_eq!(record.flag("dynamic"), Some(false));
        assert_eq!(record.flag("odd"), None);
        assert_eq!(record.flag("missing"), None);
    }

    #[test]
    fn test_reply_tag_round_trip_and_terminal() {
        for tag in [
            ReplyTag::Re,
            ReplyTag::Done,
            ReplyTag::Trap,
            ReplyTag::Fatal,
            ReplyTag::Empty,
        ] {
            assert_eq!(ReplyTag::parse(tag.as_str()), Some(tag));
        }
        assert!(ReplyTag::Done.is_terminal());
        assert!(ReplyTag::Fatal.is_terminal());
        assert!(!ReplyTag::Trap.is_terminal());
        assert!(!ReplyTag::Re.is_terminal());
        assert_eq!(ReplyTag::parse("!unknown"), None);
    }
}
