//! hr_api — HashRand server core
//!
//! Everything between the HTTP router (out of scope, consumes `handlers`)
//! and the storage layer: session lifecycle, the shared-secret engine, and
//! URL fingerprints, threaded through one [`context::Context`] value that
//! is constructed at process entry and passed by reference. No globals, no
//! singletons.
//!
//! # Zero-knowledge invariants upheld here
//! - No table row is ever keyed on an email address.
//! - The only decryptable email at rest lives inside magic-link rows (key
//!   derived from the emailed token, TTL-bounded) and secret payloads
//!   (deleted with the secret, expiry ≤ 72 h).
//! - Logs carry ids and kinds, never addresses, tokens, or key material.
//!
//! # Modules
//! - `config`       — environment configuration + process exit codes
//! - `context`      — per-process service context and clock
//! - `email`        — outbound email port (`Mailer`) + dry-run adapter
//! - `token`        — stateless signed access tokens
//! - `session_keys` — per-session server keypair derivation
//! - `magic`        — magic-link issuance and consumption
//! - `refresh`      — sliding-window session refresh
//! - `fingerprint`  — encrypted, checksummed URL tokens
//! - `secret`       — shared-secret create / view / delete / sweep
//! - `handlers`     — one function per API endpoint, envelope in/out

pub mod config;
pub mod context;
pub mod email;
pub mod fingerprint;
pub mod handlers;
pub mod magic;
pub mod refresh;
pub mod secret;
pub mod session_keys;
pub mod token;

pub use config::ServerConfig;
pub use context::Context;
