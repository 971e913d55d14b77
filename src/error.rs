//! Error types for service-broker.

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Service name was empty or malformed.
    #[error("invalid service name: {0:?}")]
    InvalidName(String),

    /// A live publication with this name already exists on this node.
    #[error("service {0:?} is already advertised by this node")]
    DuplicateService(String),

    /// Broker teardown has begun; no new publications or links are accepted.
    #[error("broker is shutting down")]
    ShuttingDown,

    /// The authority returned no resolvable endpoint for this service.
    #[error("service {0:?} is not known to the authority")]
    ServiceUnknown(String),

    /// Transport connect to the resolved endpoint failed.
    #[error("failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        /// Resolved host the connect was attempted against.
        host: String,
        /// Resolved port the connect was attempted against.
        port: u16,
        /// Underlying transport error.
        source: std::io::Error,
    },

    /// A naming-authority round trip failed.
    #[error("naming authority unreachable: {0}")]
    AuthorityUnreachable(String),
}

impl Error {
    /// Create an authority round-trip error.
    pub fn authority<S: Into<String>>(msg: S) -> Self {
        Self::AuthorityUnreachable(msg.into())
    }
}
