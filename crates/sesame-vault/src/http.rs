//! HTTP transport abstraction.
//!
//! The protocol layer only needs two verbs, so the transport is a small
//! trait rather than a dependency on any particular HTTP client. Callers
//! plug in whatever fits their runtime; the tests use an in-memory mock.

use serde_json::Value;

/// Opaque transport failure: DNS, TLS, timeouts, non-2xx statuses.
///
/// Kept as a plain string on purpose — the protocol layer treats all
/// transport failures the same way and never inspects them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Minimal blocking HTTP client.
///
/// Implementations must return the response body as text for 2xx
/// responses and a [`TransportError`] for everything else.
pub trait HttpClient {
    /// GET `url` with the given `(name, value)` headers.
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, TransportError>;

    /// POST a JSON body to `url` with `Content-Type: application/json`.
    fn post(&self, url: &str, body: &Value) -> Result<String, TransportError>;
}
