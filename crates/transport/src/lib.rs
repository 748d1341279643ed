//! Transport abstraction for calls to the notes API
//!
//! Defines the `Transport` trait that decouples the authenticated request
//! layer from the network stack. `HttpTransport` executes requests with
//! reqwest; tests substitute scripted transports that implement the same
//! trait. A transport only moves bytes: it never inspects status codes or
//! retries, so a 401 is an ordinary `ApiResponse`, and only network-level
//! problems surface as `TransportError`.

pub mod http;
pub mod request;

pub use http::HttpTransport;
pub use request::{ApiRequest, ApiResponse, Body, FilePart};

use std::future::Future;
use std::pin::Pin;

/// Network-level failures. Never caused by an HTTP status code.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("reading response body failed: {0}")]
    Body(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Boxed future returned by `Transport::execute`.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>>;

/// Executes a single request against the API and returns its raw outcome.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Identifier for logging (e.g. "http")
    fn id(&self) -> &str;

    /// Perform the call. Any HTTP status, including 401, is `Ok`.
    fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}
