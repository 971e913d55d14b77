//! Service handler capability and type signatures.
//!
//! The broker stores handlers as byte-level capabilities only: typed
//! request/response adapters (codec, schema checks) live outside the core
//! and wrap their logic in a [`ServiceHandler`].

use std::fmt;
use std::sync::Arc;

/// Identifies request/response schema compatibility between peers.
///
/// The middleware derives these from message definitions; this crate only
/// compares them. Two endpoints interoperate when their signatures match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Wrap a precomputed signature string.
    pub fn new<S: Into<String>>(sig: S) -> Self {
        Self(sig.into())
    }

    /// The raw signature string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Signature {
    fn from(sig: &str) -> Self {
        Self::new(sig)
    }
}

/// A polymorphic request handler for an advertised service.
///
/// Invoked once per incoming request with the raw request bytes; returns the
/// raw response bytes. Handler failures are application-level errors and are
/// reported to the remote caller by the dispatch layer, never treated as
/// broker faults.
pub trait ServiceHandler: Send + Sync + 'static {
    /// Handle one request.
    fn invoke(&self, request: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Adapt a closure into a [`ServiceHandler`].
///
/// ```
/// use service_broker::handler_fn;
///
/// let echo = handler_fn(|req: &[u8]| Ok(req.to_vec()));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&[u8]) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
{
    HandlerFn(f)
}

/// Handler backed by a closure. See [`handler_fn`].
pub struct HandlerFn<F>(F);

impl<F> ServiceHandler for HandlerFn<F>
where
    F: Fn(&[u8]) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
{
    fn invoke(&self, request: &[u8]) -> anyhow::Result<Vec<u8>> {
        (self.0)(request)
    }
}

impl ServiceHandler for Arc<dyn ServiceHandler> {
    fn invoke(&self, request: &[u8]) -> anyhow::Result<Vec<u8>> {
        (**self).invoke(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_fn_invokes_closure() {
        let h = handler_fn(|req: &[u8]| Ok(req.iter().rev().copied().collect()));
        assert_eq!(h.invoke(b"abc").unwrap(), b"cba".to_vec());
    }

    #[test]
    fn handler_errors_pass_through() {
        let h = handler_fn(|_req: &[u8]| anyhow::bail!("bad request"));
        let err = h.invoke(b"").unwrap_err();
        assert!(err.to_string().contains("bad request"));
    }

    #[test]
    fn signature_compares_by_content() {
        assert_eq!(Signature::new("abc123"), Signature::from("abc123"));
        assert_ne!(Signature::new("abc123"), Signature::new("def456"));
        assert_eq!(Signature::new("abc123").to_string(), "abc123");
    }
}
