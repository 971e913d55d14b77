//! Connection wrapper around a transport byte stream.
//!
//! A [`Connection`] owns the provider's stream plus the header map negotiated
//! for it. The broker only ever opens and closes connections; reading and
//! writing belongs to the dispatch layer.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::transport::BoxedByteStream;

/// Why a connection was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The owning broker or link is being destroyed.
    Destructing,
    /// The underlying transport failed.
    TransportError,
    /// Header negotiation failed or produced an incompatible peer.
    HeaderError,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::Destructing => "destructing",
            DropReason::TransportError => "transport error",
            DropReason::HeaderError => "header error",
        };
        f.write_str(reason)
    }
}

/// Key/value header exchanged when a connection is established.
pub type ConnectionHeader = HashMap<String, String>;

struct ConnectionState {
    stream: Option<BoxedByteStream>,
    drop_reason: Option<DropReason>,
}

/// An established connection to a remote endpoint.
pub struct Connection {
    state: Mutex<ConnectionState>,
    header: ConnectionHeader,
    is_server: bool,
}

impl Connection {
    /// Wrap a freshly connected stream.
    ///
    /// `is_server` records which side of the connection this node is;
    /// `header` is the header map sent (client) or received (server) during
    /// establishment.
    pub fn initialize(stream: BoxedByteStream, is_server: bool, header: ConnectionHeader) -> Self {
        Self {
            state: Mutex::new(ConnectionState {
                stream: Some(stream),
                drop_reason: None,
            }),
            header,
            is_server,
        }
    }

    /// The header map this connection was established with.
    pub fn header(&self) -> &ConnectionHeader {
        &self.header
    }

    /// Whether this node is the server side of the connection.
    pub fn is_server(&self) -> bool {
        self.is_server
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.state.lock().stream.is_some()
    }

    /// The reason the connection was closed, once it has been.
    pub fn drop_reason(&self) -> Option<DropReason> {
        self.state.lock().drop_reason
    }

    /// Tear the connection down, releasing the underlying stream.
    ///
    /// Idempotent; only the first call's reason is recorded.
    pub fn close(&self, reason: DropReason) {
        let stream = {
            let mut state = self.state.lock();
            if state.drop_reason.is_none() {
                state.drop_reason = Some(reason);
            }
            state.stream.take()
        };
        if stream.is_some() {
            debug!(%reason, "connection closed");
        }
    }

    /// Take exclusive ownership of the stream for dispatch-layer I/O.
    ///
    /// Returns `None` once the connection has been closed or the stream has
    /// already been claimed.
    pub fn take_stream(&self) -> Option<BoxedByteStream> {
        self.state.lock().stream.take()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("is_server", &self.is_server)
            .field("open", &self.is_open())
            .field("drop_reason", &self.drop_reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_connection() -> Connection {
        let (stream, _peer) = tokio::io::duplex(64);
        Connection::initialize(Box::new(stream), false, ConnectionHeader::new())
    }

    #[tokio::test]
    async fn close_is_idempotent_and_keeps_first_reason() {
        let conn = stub_connection();
        assert!(conn.is_open());
        assert_eq!(conn.drop_reason(), None);

        conn.close(DropReason::TransportError);
        conn.close(DropReason::Destructing);

        assert!(!conn.is_open());
        assert_eq!(conn.drop_reason(), Some(DropReason::TransportError));
    }

    #[tokio::test]
    async fn stream_can_be_claimed_once() {
        let conn = stub_connection();
        assert!(conn.take_stream().is_some());
        assert!(conn.take_stream().is_none());
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn header_is_preserved() {
        let (stream, _peer) = tokio::io::duplex(64);
        let header: ConnectionHeader = [("service".to_owned(), "add_two_ints".to_owned())]
            .into_iter()
            .collect();
        let conn = Connection::initialize(Box::new(stream), true, header);
        assert!(conn.is_server());
        assert_eq!(
            conn.header().get("service").map(String::as_str),
            Some("add_two_ints")
        );
    }
}
