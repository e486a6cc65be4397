//! hr_crypto — HashRand cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Pure functions only: no I/O, no global state, no clocks.
//! - Zeroize all secret material on drop.
//! - Failures carry a kind and nothing else — callers never learn *why*
//!   a signature or ciphertext was rejected.
//!
//! # Module layout
//! - `sign`     — Ed25519 signing / strict verification
//! - `ecdh`     — X25519 key agreement (contributory-behaviour check)
//! - `aead`     — ChaCha20-Poly1305 seal/open + raw ChaCha20 keystream
//! - `kdf`      — domain-separated BLAKE3 keyed derivation
//! - `identity` — email normalization, deterministic per-user keypairs, user_id
//! - `codec`    — Base58 and URL-safe Base64 (no padding)
//! - `ct`       — constant-time equality
//! - `error`    — unified error type (kind only)

pub mod aead;
pub mod codec;
pub mod ct;
pub mod ecdh;
pub mod error;
pub mod identity;
pub mod kdf;
pub mod sign;

#[cfg(test)]
mod proptests;

pub use error::CryptoError;
