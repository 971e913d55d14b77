//! Broker: the node-local service registry and link lifecycle.
//!
//! - [`ServiceBroker`] owns both collections and the shutdown protocol
//! - [`ServicePublication`] is a service this node offers
//! - [`ServiceLink`] is a remote service this node consumes

pub mod link;
pub mod publication;
pub mod registry;

pub use link::{LinkState, ServiceLink};
pub use publication::ServicePublication;
pub use registry::ServiceBroker;
