//! Node-local service registry and RPC link broker for pub/sub middleware nodes.
//!
//! A node offers services ("publications") and consumes remote services
//! ("links"); the [`ServiceBroker`] owns both collections and coordinates
//! every create/lookup/destroy with a central [`NamingAuthority`] and a
//! [`TransportProvider`]. Wire formats, framing, and the poll engine live
//! behind those seams.

#![deny(missing_docs)]

pub mod authority;
pub mod broker;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod transport;

// Re-export key types
pub use authority::{MemoryAuthority, NamingAuthority, ServiceAddress};
pub use broker::{LinkState, ServiceBroker, ServiceLink, ServicePublication};
pub use config::BrokerConfig;
pub use connection::{Connection, ConnectionHeader, DropReason};
pub use error::{Error, Result};
pub use handler::{handler_fn, HandlerFn, ServiceHandler, Signature};
pub use transport::{BoxedByteStream, ByteStream, TcpTransport, TransportProvider};
