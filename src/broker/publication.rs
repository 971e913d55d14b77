//! A locally offered service endpoint.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::handler::{ServiceHandler, Signature};

/// A service this node offers, together with its dispatch handler.
///
/// Created by [`ServiceBroker::advertise`](crate::ServiceBroker::advertise)
/// and dropped by `unadvertise` or `shutdown`. Dropping is terminal: a
/// dropped publication refuses dispatch and is never reinserted.
pub struct ServicePublication {
    name: String,
    signature: Signature,
    handler: Arc<dyn ServiceHandler>,
    dropped: AtomicBool,
}

impl ServicePublication {
    pub(crate) fn new(name: String, signature: Signature, handler: Arc<dyn ServiceHandler>) -> Self {
        Self {
            name,
            signature,
            handler,
            dropped: AtomicBool::new(false),
        }
    }

    /// The service name this publication answers for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The request/response schema signature of this service.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether the publication has been dropped.
    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    /// Invoke the handler for one incoming request.
    ///
    /// Called from dispatch-layer tasks; refuses once the publication has
    /// been dropped so in-flight requests cannot race a teardown.
    pub fn dispatch(&self, request: &[u8]) -> anyhow::Result<Vec<u8>> {
        if self.is_dropped() {
            anyhow::bail!("service {:?} is no longer advertised", self.name);
        }
        self.handler.invoke(request)
    }

    /// Mark the publication dropped. Terminal and idempotent.
    pub(crate) fn drop_publication(&self) {
        self.dropped.store(true, Ordering::Release);
    }
}

impl fmt::Debug for ServicePublication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePublication")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("dropped", &self.is_dropped())
            .finish()
    }
}
