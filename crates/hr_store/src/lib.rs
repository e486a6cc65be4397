//! hr_store — Persisted tables for HashRand over SQLite
//!
//! # Zero-knowledge at rest
//! Storage never sees plaintext identity. All keys are keyed-hash outputs
//! (`token_hash`, `user_id`, `db_index`, `reference_hash`) and the only
//! email-bearing columns are AEAD ciphertext whose keys this crate never
//! holds — encryption happens above, in the callers.
//!
//! # Atomicity
//! Multi-row invariants (the secret pair + its tracking row; magic-link
//! single use; refresh rotation) are enforced with transactions here, not
//! in the engine layer, so every public operation is atomic on its own.
//!
//! # Modules
//! - `db`           — pool handle, open + migrate
//! - `models`       — row structs
//! - `magic_links`  — single-use login tokens
//! - `refresh`      — refresh session records
//! - `user_keys`    — published permanent public keys
//! - `secrets`      — shared secret rows + tracking counters
//! - `client_cache` — client-side confirm-read cache
//! - `error`        — unified error type

pub mod client_cache;
pub mod db;
pub mod error;
pub mod magic_links;
pub mod models;
pub mod refresh;
pub mod secrets;
pub mod user_keys;

pub use db::Store;
pub use error::StoreError;
