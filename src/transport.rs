//! Transport-provider seam and the built-in TCP backend.
//!
//! The broker never touches sockets directly: it asks a [`TransportProvider`]
//! for a byte stream and hands it to a [`Connection`](crate::Connection).
//! Framing, handshakes, and poll scheduling all live behind this seam.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// A bidirectional byte stream produced by a transport provider.
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ByteStream for T {}

/// Boxed stream as returned by [`TransportProvider::connect`].
pub type BoxedByteStream = Box<dyn ByteStream>;

/// Opens byte-stream connections to remote endpoints.
///
/// Connect timeout policy belongs to the implementation, not the broker;
/// callers treat [`connect`](TransportProvider::connect) as potentially slow.
#[async_trait]
pub trait TransportProvider: Send + Sync + 'static {
    /// Open a connection to `host:port`.
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedByteStream>;
}

/// Plain TCP transport backend.
#[derive(Debug, Default, Clone)]
pub struct TcpTransport;

impl TcpTransport {
    /// Create a TCP transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportProvider for TcpTransport {
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedByteStream> {
        let stream = TcpStream::connect((host, port)).await?;
        debug!(%host, %port, "tcp connect established");
        Ok(Box::new(stream))
    }
}
