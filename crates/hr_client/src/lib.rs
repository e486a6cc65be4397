//! hr_client — HashRand client core
//!
//! The browser UI and its HTTP stack are external; this crate is the part
//! that must be exactly right: ephemeral key lifecycles, envelope signing
//! and response verification against the pinned server key, the
//! single-flight refresh with its one-retry rule, recovery of the
//! permanent keypairs from `privkey_context`, and the confirm-read cache.
//!
//! # Modules
//! - `transport` — minimal async port the HTTP adapter implements
//! - `keys`      — ephemeral (Sistema A) and permanent (Sistema B) keys
//! - `session`   — login, refresh, authenticated calls, logout
//! - `cache`     — per-device confirm-read cache
//! - `error`     — client error type

pub mod cache;
pub mod error;
pub mod keys;
pub mod session;
pub mod transport;

pub use error::ClientError;
pub use session::ClientSession;
