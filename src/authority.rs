//! Naming-authority client seam and built-in backends.
//!
//! The authority is the central naming service every node trusts for service
//! registration and resolution. The wire protocol behind it is out of scope
//! here; the broker consumes only this trait.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// A resolved service endpoint as reported by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddress {
    /// Host the service listens on.
    pub host: String,
    /// Port the service listens on.
    pub port: u16,
}

impl ServiceAddress {
    /// Create an address from host and port.
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a `host:port` endpoint URI, with an optional `scheme://` prefix.
    ///
    /// Returns `None` when the host is empty or the port is missing, zero, or
    /// unparsable.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let rest = match uri.find("://") {
            Some(idx) => &uri[idx + 3..],
            None => uri,
        };
        let rest = rest.trim_end_matches('/');
        let (host, port) = rest.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        let port: u16 = port.parse().ok()?;
        if port == 0 {
            return None;
        }
        Some(Self::new(host, port))
    }

    /// Whether this address can actually be connected to.
    pub fn is_routable(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Client seam for the central naming authority.
///
/// All calls are remote round-trips from the broker's point of view; timeout
/// policy belongs to the implementation. Registration calls return whether
/// the authority accepted the change.
#[async_trait]
pub trait NamingAuthority: Send + Sync + 'static {
    /// Register `service` as offered by `node` at `rpc_uri`.
    ///
    /// `callback_uri` is the node's API endpoint the authority uses for
    /// notifications.
    async fn register_service(
        &self,
        node: &str,
        service: &str,
        rpc_uri: &str,
        callback_uri: &str,
    ) -> Result<bool>;

    /// Remove a prior registration of `service` by `node` at `rpc_uri`.
    async fn unregister_service(&self, node: &str, service: &str, rpc_uri: &str) -> Result<bool>;

    /// Resolve `service` to the address of the node currently offering it.
    async fn lookup_service(&self, node: &str, service: &str) -> Result<ServiceAddress>;
}

/// In-memory naming authority.
///
/// Useful for single-process topologies and tests: registrations land in a
/// local table and lookups resolve from it, with the same at-most-one-node
/// semantics the real authority enforces (a later registration replaces an
/// earlier one).
#[derive(Default)]
pub struct MemoryAuthority {
    services: Mutex<HashMap<String, ServiceAddress>>,
}

impl MemoryAuthority {
    /// Create an empty authority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an authority pre-filled with known services.
    pub fn with_services<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = (S, ServiceAddress)>,
        S: Into<String>,
    {
        Self {
            services: Mutex::new(
                services
                    .into_iter()
                    .map(|(name, addr)| (name.into(), addr))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl NamingAuthority for MemoryAuthority {
    async fn register_service(
        &self,
        node: &str,
        service: &str,
        rpc_uri: &str,
        _callback_uri: &str,
    ) -> Result<bool> {
        let Some(addr) = ServiceAddress::from_uri(rpc_uri) else {
            debug!(%node, %service, %rpc_uri, "register rejected: bad rpc uri");
            return Ok(false);
        };
        self.services
            .lock()
            .insert(service.to_owned(), addr);
        Ok(true)
    }

    async fn unregister_service(&self, _node: &str, service: &str, rpc_uri: &str) -> Result<bool> {
        let mut services = self.services.lock();
        let registered_here = services
            .get(service)
            .is_some_and(|addr| ServiceAddress::from_uri(rpc_uri).as_ref() == Some(addr));
        if registered_here {
            services.remove(service);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn lookup_service(&self, _node: &str, service: &str) -> Result<ServiceAddress> {
        self.services
            .lock()
            .get(service)
            .cloned()
            .ok_or_else(|| Error::ServiceUnknown(service.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_uri_accepts_scheme_and_plain_forms() {
        let addr = ServiceAddress::from_uri("rpc://box:4567").unwrap();
        assert_eq!(addr, ServiceAddress::new("box", 4567));
        assert_eq!(
            ServiceAddress::from_uri("box:4567"),
            Some(ServiceAddress::new("box", 4567))
        );
        assert_eq!(
            ServiceAddress::from_uri("rpc://box:4567/"),
            Some(ServiceAddress::new("box", 4567))
        );
    }

    #[test]
    fn from_uri_rejects_malformed_endpoints() {
        assert_eq!(ServiceAddress::from_uri(""), None);
        assert_eq!(ServiceAddress::from_uri("boxonly"), None);
        assert_eq!(ServiceAddress::from_uri(":4567"), None);
        assert_eq!(ServiceAddress::from_uri("box:"), None);
        assert_eq!(ServiceAddress::from_uri("box:0"), None);
        assert_eq!(ServiceAddress::from_uri("box:notaport"), None);
    }

    #[tokio::test]
    async fn register_lookup_unregister_round_trip() {
        let authority = MemoryAuthority::new();
        assert!(authority
            .register_service("node", "svc", "rpc://box:4567", "api://box:4568")
            .await
            .unwrap());

        let addr = authority.lookup_service("node", "svc").await.unwrap();
        assert_eq!(addr, ServiceAddress::new("box", 4567));

        // Wrong rpc uri does not remove the registration.
        assert!(!authority
            .unregister_service("node", "svc", "rpc://other:1")
            .await
            .unwrap());
        assert!(authority
            .unregister_service("node", "svc", "rpc://box:4567")
            .await
            .unwrap());

        let err = authority.lookup_service("node", "svc").await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnknown(name) if name == "svc"));
    }

    #[tokio::test]
    async fn register_with_bad_uri_is_refused() {
        let authority = MemoryAuthority::new();
        assert!(!authority
            .register_service("node", "svc", "not-an-endpoint", "api://box:1")
            .await
            .unwrap());
    }
}
