//! Session types: one authenticated connection to a router.
//!
//! A session tracks:
//! - WHERE it is connected (the peer and the live connection)
//! - WHO it logged in as (the credential that was accepted)
//! - WHAT state it is in (authenticated, executing, broken, disconnected)

use std::fmt;
use std::time::Duration;

use hotspot_protocol::{FrameLimits, ProtocolError, Reply, ReplyStream, ReplyTag};
use hotspot_transport::{Connection, ConnectionId, Connector};
use serde::{Deserialize, Serialize};

use crate::exchange::exchange;
use crate::{Credential, SessionError};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deadline, in milliseconds, for each sentence written or read.
    ///
    /// Default: 10 seconds.
    pub io_timeout_ms: u64,

    /// Sanity limits for incoming sentences.
    pub limits: FrameLimits,
}

impl SessionConfig {
    /// The per-sentence I/O deadline.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            io_timeout_ms: 10_000,
            limits: FrameLimits::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
/// Unconnected → Connecting → Authenticated ⇄ Executing
///      ↑            │              │             │
///      └── failed ──┘              ▼             ▼ I/O error, timeout, !fatal
///                            Disconnected ←── Broken
/// ```
///
/// A session is `Connecting` while [`Session::open`] works through
/// credentials and drops back to `Unconnected` if none is accepted. A
/// session left in `Executing` means a command future was dropped
/// mid-reply: the socket may hold half a reply, so it is as unusable as
/// `Broken`. The same goes for `Connecting` after a dropped `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connecting,
    Authenticated,
    Executing,
    Broken,
    Disconnected,
}

impl SessionState {
    /// Returns `true` if a command may be issued.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Authenticated => "authenticated",
            Self::Executing => "executing",
            Self::Broken => "broken",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An authenticated command session.
///
/// One command is in flight at a time: [`execute`](Self::execute) takes
/// `&mut self`. Sessions share nothing, so concurrent callers each open
/// their own.
pub struct Session<C: Connection> {
    conn: Option<C>,
    state: SessionState,
    credential: Option<Credential>,
    peer: String,
    config: SessionConfig,
}

impl<C: Connection> Session<C> {
    /// Creates an `Unconnected` session. Call [`open`](Self::open) to log in.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            conn: None,
            state: SessionState::Unconnected,
            credential: None,
            peer: String::new(),
            config,
        }
    }

    /// Connects and logs in, trying `credentials` in order.
    ///
    /// Shorthand for [`new`](Self::new) followed by [`open`](Self::open).
    pub async fn connect<K>(
        connector: &K,
        credentials: &[Credential],
        config: SessionConfig,
    ) -> Result<Self, SessionError>
    where
        K: Connector<Connection = C>,
    {
        let mut session = Self::new(config);
        session.open(connector, credentials).await?;
        Ok(session)
    }

    /// Logs an `Unconnected` session in, trying `credentials` in order.
    ///
    /// Every attempt uses a fresh connection from `connector`. The first
    /// credential the router accepts wins. On failure the session is
    /// `Unconnected` again and `open` may be retried.
    ///
    /// # Errors
    /// - [`SessionError::Unusable`] if the session is not `Unconnected`
    /// - [`SessionError::NoCredentials`] for an empty list
    /// - [`SessionError::Authentication`] if the router rejected every
    ///   credential
    /// - the last connection/timeout error if the router was never reached
    ///   well enough to reject anything
    pub async fn open<K>(
        &mut self,
        connector: &K,
        credentials: &[Credential],
    ) -> Result<(), SessionError>
    where
        K: Connector<Connection = C>,
    {
        if self.state != SessionState::Unconnected {
            return Err(SessionError::Unusable(self.state));
        }
        if credentials.is_empty() {
            return Err(SessionError::NoCredentials);
        }

        self.peer = connector.peer();
        self.state = SessionState::Connecting;
        match try_credentials(connector, credentials, &self.peer, &self.config).await {
            Ok((conn, credential)) => {
                tracing::info!(
                    peer = %self.peer,
                    id = %conn.id(),
                    username = %credential.username,
                    "logged in"
                );
                self.conn = Some(conn);
                self.credential = Some(credential.clone());
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Unconnected;
                Err(e)
            }
        }
    }

    /// Sends one command and returns the raw reply stream.
    ///
    /// `args` are complete words (`=key=value`, `?key=value`, ...). The
    /// stream is returned even when it carries a `!trap` or `!fatal`; use
    /// [`run`](Self::run) to get those as errors.
    ///
    /// # Errors
    /// - [`SessionError::Unusable`] immediately if the session isn't
    ///   authenticated (never touches the wire)
    /// - [`SessionError::Protocol`] with [`ProtocolError::EmptyWord`] if
    ///   the command or an argument is empty; nothing is sent and the
    ///   session stays usable
    /// - connection, timeout, or other protocol errors; these leave the
    ///   session [`SessionState::Broken`]
    pub async fn execute<A: AsRef<str>>(
        &mut self,
        command: &str,
        args: &[A],
    ) -> Result<ReplyStream, SessionError> {
        if !self.state.is_ready() {
            return Err(SessionError::Unusable(self.state));
        }
        let Some(conn) = self.conn.as_ref() else {
            return Err(SessionError::Unusable(self.state));
        };

        let mut words = Vec::with_capacity(1 + args.len());
        words.push(command);
        words.extend(args.iter().map(|a| a.as_ref()));

        self.state = SessionState::Executing;
        let result = exchange(conn, &words, &self.config.limits, self.config.io_timeout()).await;

        match result {
            Ok(stream) => {
                self.state = match stream.terminal() {
                    ReplyTag::Done => SessionState::Authenticated,
                    terminal => {
                        tracing::warn!(
                            peer = %self.peer,
                            command,
                            %terminal,
                            "router ended the session"
                        );
                        SessionState::Broken
                    }
                };
                Ok(stream)
            }
            // Refused while encoding: nothing reached the wire.
            Err(e @ ProtocolError::EmptyWord { .. }) => {
                self.state = SessionState::Authenticated;
                tracing::debug!(peer = %self.peer, command, error = %e, "command not sent");
                Err(e.into())
            }
            Err(e) => {
                self.state = SessionState::Broken;
                tracing::warn!(
                    peer = %self.peer,
                    command,
                    error = %e,
                    "command failed, session broken"
                );
                Err(e.into())
            }
        }
    }

    /// Sends one command and parses the reply into records.
    ///
    /// # Errors
    /// Everything [`execute`](Self::execute) returns, plus
    /// [`SessionError::Command`] when the router answered `!trap` or
    /// `!fatal`.
    pub async fn run<A: AsRef<str>>(
        &mut self,
        command: &str,
        args: &[A],
    ) -> Result<Reply, SessionError> {
        let stream = self.execute(command, args).await?;
        match stream.parse() {
            Ok(reply) => {
                let records = reply.records.len();
                tracing::debug!(peer = %self.peer, command, records, "command done");
                Ok(reply)
            }
            Err(e) => {
                let reason = e.message.as_str();
                tracing::debug!(peer = %self.peer, command, reason, "command refused");
                Err(e.into())
            }
        }
    }

    /// Closes the session. Safe to call more than once.
    ///
    /// The state flips to `Disconnected` before the socket is closed, so a
    /// half-closed connection can never be picked up by another command.
    pub async fn disconnect(&mut self) {
        self.state = SessionState::Disconnected;
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                tracing::debug!(peer = %self.peer, error = %e, "error while closing");
            }
            tracing::info!(peer = %self.peer, id = %conn.id(), "disconnected");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` if the session can run commands.
    pub fn is_authenticated(&self) -> bool {
        self.state.is_ready()
    }

    /// The credential the router accepted, once logged in.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// The router this session talks to. Empty until [`open`](Self::open)
    /// is called.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// The id of the live connection, if still open.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.conn.as_ref().map(Connection::id)
    }

    /// The configuration this session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// Walks `credentials` on fresh connections until one is accepted.
async fn try_credentials<'a, K: Connector>(
    connector: &K,
    credentials: &'a [Credential],
    peer: &str,
    config: &SessionConfig,
) -> Result<(K::Connection, &'a Credential), SessionError> {
    let mut attempted = Vec::with_capacity(credentials.len());
    let mut rejected = false;
    let mut last_error = None;

    for credential in credentials {
        let username = credential.username.as_str();
        attempted.push(credential.username.clone());
        tracing::debug!(%peer, %username, "login attempt");

        let conn = match connector.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "connect failed");
                last_error = Some(SessionError::Connection(e));
                continue;
            }
        };

        match crate::login::login(&conn, credential, config).await {
            Ok(()) => return Ok((conn, credential)),
            Err(SessionError::Command(e)) => {
                tracing::warn!(%peer, %username, reason = %e.message, "login rejected");
                rejected = true;
            }
            Err(e) => {
                tracing::warn!(%peer, %username, error = %e, "login failed");
                last_error = Some(e);
            }
        }

        if let Err(e) = conn.close().await {
            tracing::debug!(%peer, error = %e, "close after failed login");
        }
    }

    match last_error {
        Some(err) if !rejected => Err(err),
        _ => Err(SessionError::Authentication {
            peer: peer.to_string(),
            attempted,
        }),
    }
}

impl<C: Connection> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("credential", &self.credential)
            .field("connection", &self.connection_id())
            .finish()
    }
}
