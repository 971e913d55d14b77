//! The service registry and link broker core.
//!
//! One [`ServiceBroker`] per node, constructed explicitly by the hosting
//! process and shared as `Arc<ServiceBroker>` with every collaborator. The
//! publication collection, the link collection, and the shutdown flag are
//! independent mutual-exclusion domains, so publication traffic and link
//! traffic never serialize against each other. Guards are held only for
//! collection operations, never across an authority round-trip, a transport
//! connect, or a connection teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::authority::NamingAuthority;
use crate::config::BrokerConfig;
use crate::connection::{Connection, ConnectionHeader, DropReason};
use crate::error::{Error, Result};
use crate::handler::{ServiceHandler, Signature};
use crate::transport::TransportProvider;

use super::link::ServiceLink;
use super::publication::ServicePublication;

/// Node-local service registry and RPC link broker.
///
/// Tracks the services this node offers and the remote services it consumes,
/// and mediates every create/lookup/destroy against the naming authority and
/// the transport provider. All entry points are thread-safe and callable
/// from any task.
pub struct ServiceBroker {
    config: BrokerConfig,
    authority: Arc<dyn NamingAuthority>,
    transport: Arc<dyn TransportProvider>,
    publications: Mutex<HashMap<String, Arc<ServicePublication>>>,
    links: Mutex<HashMap<u64, Arc<ServiceLink>>>,
    next_link_id: AtomicU64,
    shutting_down: AtomicBool,
}

impl ServiceBroker {
    /// Create a broker for this node.
    pub fn new(
        config: BrokerConfig,
        authority: Arc<dyn NamingAuthority>,
        transport: Arc<dyn TransportProvider>,
    ) -> Self {
        Self {
            config,
            authority,
            transport,
            publications: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
            next_link_id: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// The configuration this broker was built with.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Whether teardown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Offer a service under `name`, dispatching requests to `handler`.
    ///
    /// The publication is live locally as soon as this returns; registration
    /// with the authority is issued afterwards and an authority failure is
    /// logged and swallowed (local state is authoritative, the authority
    /// converges).
    pub async fn advertise<H>(
        &self,
        name: &str,
        signature: Signature,
        handler: H,
    ) -> Result<Arc<ServicePublication>>
    where
        H: ServiceHandler,
    {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }
        validate_name(name)?;

        let publication = {
            let mut publications = self.publications.lock();
            // Re-check under the guard: a publication must never materialize
            // after shutdown has drained the collection.
            if self.is_shutting_down() {
                return Err(Error::ShuttingDown);
            }
            if publications
                .get(name)
                .is_some_and(|existing| !existing.is_dropped())
            {
                warn!(service = %name, "already advertised by this node");
                return Err(Error::DuplicateService(name.to_owned()));
            }
            let publication = Arc::new(ServicePublication::new(
                name.to_owned(),
                signature,
                Arc::new(handler),
            ));
            publications.insert(name.to_owned(), Arc::clone(&publication));
            publication
        };

        info!(service = %name, "advertised service");

        if let Err(err) = self
            .authority
            .register_service(
                self.config.node_name(),
                name,
                self.config.rpc_uri(),
                self.config.callback_uri(),
            )
            .await
        {
            warn!(service = %name, error = %err, "authority registration failed; keeping local publication");
        }

        Ok(publication)
    }

    /// Stop offering `name`.
    ///
    /// Returns `true` if a live publication was removed. Idempotent: a second
    /// call for the same name returns `false` with no side effects.
    pub async fn unadvertise(&self, name: &str) -> bool {
        if self.is_shutting_down() {
            return false;
        }

        let publication = {
            let mut publications = self.publications.lock();
            let live = publications
                .get(name)
                .is_some_and(|existing| !existing.is_dropped());
            if live {
                publications.remove(name)
            } else {
                None
            }
        };

        let Some(publication) = publication else {
            return false;
        };

        self.unregister_with_authority(name).await;
        publication.drop_publication();
        info!(service = %name, "unadvertised service");
        true
    }

    /// Open a link to the remote service `name`.
    ///
    /// Resolves the service through the authority, connects through the
    /// transport provider, and only inserts a fully initialized link into
    /// the link set. May block on the authority round-trip and the connect;
    /// timeout policy belongs to those providers.
    pub async fn create_link(
        &self,
        name: &str,
        persistent: bool,
        request_signature: Signature,
        response_signature: Signature,
        header: ConnectionHeader,
    ) -> Result<Arc<ServiceLink>> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }
        validate_name(name)?;

        let address = match self.authority.lookup_service(self.config.node_name(), name).await {
            Ok(address) => address,
            Err(err) => {
                debug!(service = %name, error = %err, "service lookup failed");
                return Err(Error::ServiceUnknown(name.to_owned()));
            }
        };
        if !address.is_routable() {
            debug!(service = %name, %address, "lookup returned unroutable address");
            return Err(Error::ServiceUnknown(name.to_owned()));
        }

        let stream = self
            .transport
            .connect(&address.host, address.port)
            .await
            .map_err(|source| Error::ConnectFailed {
                host: address.host.clone(),
                port: address.port,
                source,
            })?;

        let connection = Connection::initialize(stream, false, header);
        let link = Arc::new(ServiceLink::new(
            self.next_link_id.fetch_add(1, Ordering::Relaxed),
            name.to_owned(),
            persistent,
            request_signature,
            response_signature,
            connection,
        ));
        link.activate();

        // Insert under the links guard, re-checking the flag there: a link
        // must never materialize after shutdown has drained the set.
        {
            let mut links = self.links.lock();
            if self.is_shutting_down() {
                drop(links);
                link.close(DropReason::Destructing);
                return Err(Error::ShuttingDown);
            }
            links.insert(link.id(), Arc::clone(&link));
        }

        debug!(service = %name, %address, persistent, "service link established");
        Ok(link)
    }

    /// Remove a link from the broker's set.
    ///
    /// Best-effort: a no-op once shutdown has begun (the set has already
    /// been drained) or if the link was never held. The link itself is not
    /// closed; that is the caller's decision.
    pub fn remove_link(&self, link: &Arc<ServiceLink>) {
        if self.is_shutting_down() {
            return;
        }
        self.links.lock().remove(&link.id());
    }

    /// Find a publication by name, irrespective of dropped state.
    ///
    /// Used by the dispatch layer to route incoming requests.
    pub fn lookup(&self, name: &str) -> Option<Arc<ServicePublication>> {
        self.publications.lock().get(name).cloned()
    }

    /// Route one incoming request to the matching publication's handler.
    pub fn dispatch(&self, name: &str, request: &[u8]) -> anyhow::Result<Vec<u8>> {
        let Some(publication) = self.lookup(name) else {
            anyhow::bail!("no publication for service {name:?}");
        };
        publication.dispatch(request)
    }

    /// Number of publications currently held.
    pub fn publication_count(&self) -> usize {
        self.publications.lock().len()
    }

    /// Number of links currently held.
    pub fn link_count(&self) -> usize {
        self.links.lock().len()
    }

    /// Tear down every publication and link. One-shot, first-caller-wins.
    ///
    /// Flips the shutting-down flag, then unregisters and drops every
    /// publication and force-closes every link connection. Both collections
    /// are snapshotted and cleared under their guards first; every remote
    /// call and connection teardown happens with no guard held, so handler
    /// callbacks re-entering the broker cannot deadlock. Concurrent callers
    /// after the first return immediately.
    pub async fn shutdown(&self) {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        info!(node = %self.config.node_name(), "broker shutting down");

        let publications: Vec<_> = {
            let mut publications = self.publications.lock();
            publications.drain().map(|(_, publication)| publication).collect()
        };
        for publication in &publications {
            self.unregister_with_authority(publication.name()).await;
            publication.drop_publication();
        }

        let links: Vec<_> = {
            let mut links = self.links.lock();
            links.drain().map(|(_, link)| link).collect()
        };
        for link in &links {
            link.close(DropReason::Destructing);
        }

        debug!(
            publications = publications.len(),
            links = links.len(),
            "broker shutdown complete"
        );
    }

    /// Unregister with the authority, swallowing failures: local teardown
    /// proceeds unconditionally.
    async fn unregister_with_authority(&self, name: &str) {
        let result = self
            .authority
            .unregister_service(self.config.node_name(), name, self.config.rpc_uri())
            .await;
        match result {
            Ok(true) => {}
            Ok(false) => debug!(service = %name, "authority had no matching registration"),
            Err(err) => {
                warn!(service = %name, error = %err, "authority unregistration failed; continuing teardown");
            }
        }
    }
}

impl std::fmt::Debug for ServiceBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBroker")
            .field("node", &self.config.node_name())
            .field("publications", &self.publication_count())
            .field("links", &self.link_count())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

/// Reject empty or whitespace-carrying service names before any collection
/// is touched.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidName(name.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert!(validate_name("add_two_ints").is_ok());
        assert!(validate_name("/ns/add_two_ints").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("two words").is_err());
        assert!(validate_name("tab\tname").is_err());
    }
}
