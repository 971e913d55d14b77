//! Broker configuration.

/// Identity and endpoints the broker presents to the naming authority.
///
/// The hosting process builds one of these during startup and hands it to
/// [`ServiceBroker::new`](crate::ServiceBroker::new). The URIs are advertised
/// verbatim; binding the actual listeners is the transport layer's job.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    node_name: String,
    rpc_uri: String,
    callback_uri: String,
}

impl BrokerConfig {
    /// Create a configuration for a node.
    ///
    /// `rpc_uri` is the endpoint remote peers connect to for this node's
    /// services; `callback_uri` is the node's API endpoint the authority
    /// calls back on.
    pub fn new<N, R, C>(node_name: N, rpc_uri: R, callback_uri: C) -> Self
    where
        N: Into<String>,
        R: Into<String>,
        C: Into<String>,
    {
        Self {
            node_name: node_name.into(),
            rpc_uri: rpc_uri.into(),
            callback_uri: callback_uri.into(),
        }
    }

    /// The node's name as registered with the authority.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// The RPC endpoint advertised for this node's services.
    pub fn rpc_uri(&self) -> &str {
        &self.rpc_uri
    }

    /// The API callback endpoint registered with the authority.
    pub fn callback_uri(&self) -> &str {
        &self.callback_uri
    }
}
