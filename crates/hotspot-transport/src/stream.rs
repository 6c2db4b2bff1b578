//! [`Connection`] over any tokio byte stream.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A [`Connection`] backed by a split tokio stream.
///
/// The read and write halves sit behind separate locks so a writer never
/// waits on a reader that is blocked for the next reply.
pub struct StreamConnection<S> {
    id: ConnectionId,
    reader: Mutex<ReadHalf<S>>,
    writer: Mutex<WriteHalf<S>>,
}

impl<S> StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wraps `stream`, assigning it a fresh [`ConnectionId`].
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }
}

impl<S> Connection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await.map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv_exact(&self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut reader = self.reader.lock().await;
        match reader.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(
                TransportError::ConnectionClosed(format!("{} closed by peer", self.id)),
            ),
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                Err(TransportError::ConnectionClosed(format!("{} reset by peer", self.id)))
            }
            Err(e) => Err(TransportError::ReceiveFailed(e)),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
