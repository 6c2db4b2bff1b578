//! Transport abstraction layer for the hotspot client.
//!
//! Provides the [`Connection`] and [`Connector`] traits that abstract over
//! the byte stream the router protocol runs on. The protocol layer only
//! ever asks for two things: "write these bytes" and "give me exactly N
//! bytes". Everything above (framing, login, replies) is built on that.
//!
//! - [`StreamConnection`] wraps any `AsyncRead + AsyncWrite` stream, so
//!   tests can drive the client over `tokio::io::duplex` pipes.
//! - [`TcpConnector`] opens [`TcpConnection`]s to a router with a bounded
//!   connect timeout.

#![allow(async_fn_in_trait)]

mod error;
mod stream;
mod tcp;

pub use error::TransportError;
pub use stream::StreamConnection;
pub use tcp::{DEFAULT_CONNECT_TIMEOUT, TcpConnection, TcpConnector};

use std::fmt;

/// Opaque identifier for a connection, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens new outbound connections.
///
/// A session may need several connections over its life: the login
/// sequence opens a fresh one for every credential it tries, because a
/// router that rejected a login is not guaranteed to accept another
/// attempt on the same socket.
pub trait Connector: Send + Sync {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a new connection to the peer.
    async fn connect(&self) -> Result<Self::Connection, TransportError>;

    /// Human-readable description of the peer, for logs and errors.
    fn peer(&self) -> String;
}

/// A single bidirectional byte stream.
pub trait Connection: Send + Sync + 'static {
    /// Writes all of `data` to the peer.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Fills `buf` completely from the stream.
    ///
    /// Returns [`TransportError::ConnectionClosed`] if the peer closes the
    /// stream before `buf` is full.
    async fn recv_exact(&self, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Shuts down the write side of the connection.
    async fn close(&self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
