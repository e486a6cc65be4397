//! hr_proto — Wire types, signed envelopes, and error taxonomy for HashRand
//!
//! Every request and response (outside a small exempt set: version info and
//! the email dry-run toggle) crosses the wire as a [`envelope::SignedEnvelope`].
//! The payload inside is canonical JSON, so client and server produce
//! byte-identical bytes for the same logical value and signatures transfer.
//!
//! # Modules
//! - `canonical` — deterministic JSON serialization
//! - `envelope`  — sign/verify wrapper around canonical payloads
//! - `api`       — request/response types shared between client and server
//! - `error`     — error kinds with HTTP status and translatable message keys

pub mod api;
pub mod canonical;
pub mod envelope;
pub mod error;

#[cfg(test)]
mod proptests;

pub use envelope::SignedEnvelope;
pub use error::ApiError;
