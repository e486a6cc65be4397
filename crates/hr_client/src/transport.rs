//! Transport port.
//!
//! The concrete HTTP stack (fetch in the browser, an HTTP client in
//! native shells) lives outside this crate. Two properties it must
//! provide, matching browser semantics:
//!
//! - The refresh cookie is HTTP-only: the adapter stores and replays it
//!   opaquely; the session logic never sees its value.
//! - Each request has a bounded deadline; a timeout surfaces as a
//!   transport error and the envelope counts as unsent.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path with query, e.g. `/api/shared-secret/abc?otp=123456789`.
    pub path: String,
    /// Access token for authenticated endpoints.
    pub bearer: Option<String>,
    /// JSON body (a serialized `SignedEnvelope`) for POST/DELETE.
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}
