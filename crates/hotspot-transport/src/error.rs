use std::time::Duration;

/// Errors that can occur in the transport layer.
///
/// Every variant is terminal for the connection it came from: the
/// transport never retries, callers open a fresh connection instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection (EOF mid-read or a reset).
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening the TCP connection failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The TCP connection was not established within the connect timeout.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
