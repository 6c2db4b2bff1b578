//! TCP connector for routers reachable over the network.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::{Connection, Connector, StreamConnection, TransportError};

/// A connection to a router over plain TCP.
pub type TcpConnection = StreamConnection<TcpStream>;

/// Default time allowed for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens [`TcpConnection`]s to a fixed `host:port`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector for `host:port` with the default connect timeout.
    ///
    /// Bare IPv6 literals are bracketed.
    pub fn new(host: &str, port: u16) -> Self {
        let addr = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        Self {
            addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the time allowed for establishing each connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the `host:port` this connector dials.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Connector for TcpConnector {
    type Connection = TcpConnection;

    async fn connect(&self) -> Result<TcpConnection, TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                addr: self.addr.clone(),
                timeout: self.connect_timeout,
            })?
            .map_err(|source| TransportError::ConnectFailed {
                addr: self.addr.clone(),
                source,
            })?;

        // Sentences are small and strictly request/reply.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %self.addr, error = %e, "failed to set TCP_NODELAY");
        }

        let conn = StreamConnection::new(stream);
        tracing::debug!(id = %conn.id(), addr = %self.addr, "connected to router");
        Ok(conn)
    }

    fn peer(&self) -> String {
        self.addr.clone()
    }
}
