//! A locally held handle to a remote service endpoint.

use std::fmt;

use parking_lot::Mutex;

use crate::connection::{Connection, DropReason};
use crate::handler::Signature;

/// Lifecycle of a [`ServiceLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Connection established, handshake still in flight.
    Connecting,
    /// Handshake complete; requests may flow.
    Active,
    /// Handshake never completed. Terminal.
    Failed,
    /// Torn down locally. Terminal.
    Closed,
}

/// A remote service this node is actively using.
///
/// Created by [`ServiceBroker::create_link`](crate::ServiceBroker::create_link)
/// only once the target has been resolved and connected; a link never appears
/// in the broker's set half-built. Belongs to exactly one set entry until
/// closed.
pub struct ServiceLink {
    id: u64,
    service: String,
    persistent: bool,
    request_signature: Signature,
    response_signature: Signature,
    connection: Connection,
    state: Mutex<LinkState>,
}

impl ServiceLink {
    pub(crate) fn new(
        id: u64,
        service: String,
        persistent: bool,
        request_signature: Signature,
        response_signature: Signature,
        connection: Connection,
    ) -> Self {
        Self {
            id,
            service,
            persistent,
            request_signature,
            response_signature,
            connection,
            state: Mutex::new(LinkState::Connecting),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The remote service this link targets.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Whether the connection is kept open across calls.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Request schema signature expected by the remote service.
    pub fn request_signature(&self) -> &Signature {
        &self.request_signature
    }

    /// Response schema signature expected from the remote service.
    pub fn response_signature(&self) -> &Signature {
        &self.response_signature
    }

    /// The connection this link exclusively owns.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Handshake completed; the link may carry requests.
    pub(crate) fn activate(&self) {
        let mut state = self.state.lock();
        if *state == LinkState::Connecting {
            *state = LinkState::Active;
        }
    }

    /// Record a handshake failure and drop the connection.
    ///
    /// Called by the dispatch layer when header negotiation never completes.
    /// No-op once the link is already terminal.
    pub fn fail(&self, reason: DropReason) {
        {
            let mut state = self.state.lock();
            match *state {
                LinkState::Failed | LinkState::Closed => return,
                _ => *state = LinkState::Failed,
            }
        }
        self.connection.close(reason);
    }

    /// Tear the link down locally, closing its connection.
    ///
    /// Idempotent; persistent and one-shot links close the same way.
    pub fn close(&self, reason: DropReason) {
        {
            let mut state = self.state.lock();
            match *state {
                LinkState::Failed | LinkState::Closed => return,
                _ => *state = LinkState::Closed,
            }
        }
        self.connection.close(reason);
    }
}

impl fmt::Debug for ServiceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLink")
            .field("service", &self.service)
            .field("persistent", &self.persistent)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionHeader;

    fn stub_link() -> ServiceLink {
        let (stream, _peer) = tokio::io::duplex(64);
        let connection =
            Connection::initialize(Box::new(stream), false, ConnectionHeader::new());
        ServiceLink::new(
            1,
            "probe".to_owned(),
            false,
            Signature::new("req"),
            Signature::new("res"),
            connection,
        )
    }

    #[tokio::test]
    async fn activation_only_from_connecting() {
        let link = stub_link();
        assert_eq!(link.state(), LinkState::Connecting);
        link.activate();
        assert_eq!(link.state(), LinkState::Active);

        link.close(DropReason::Destructing);
        link.activate();
        assert_eq!(link.state(), LinkState::Closed);
    }

    #[tokio::test]
    async fn failure_is_terminal_and_drops_connection() {
        let link = stub_link();
        link.fail(DropReason::HeaderError);
        assert_eq!(link.state(), LinkState::Failed);
        assert_eq!(link.connection().drop_reason(), Some(DropReason::HeaderError));

        // A later close keeps the original failure reason on the connection.
        link.close(DropReason::Destructing);
        assert_eq!(link.state(), LinkState::Failed);
        assert_eq!(link.connection().drop_reason(), Some(DropReason::HeaderError));
    }
}
