//! Identity and deterministic per-user key derivation
//!
//! Two key systems coexist:
//!
//! - *Ephemeral* keypairs, minted fresh at login and rotated with the
//!   session window. They sign request envelopes and receive E2E payloads.
//! - *Permanent* keypairs, derived deterministically from
//!   `(email, privkey_context)`. Re-running the derivation after total
//!   client storage loss reproduces the same keys bit for bit.
//!
//! The 16-byte `user_id` is a keyed hash of the normalized email under the
//! server master key. It cannot be inverted to the address, and no table is
//! ever keyed on the address itself.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use unicode_normalization::UnicodeNormalization;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::kdf::{kdf32, kdf_array};

pub const USER_ID_LEN: usize = 16;

/// Canonical form of an email address for derivation purposes:
/// trimmed, lowercased, Unicode-NFC-composed.
///
/// Client and server MUST agree byte-for-byte, so both call this exact
/// function before any keyed hash of an address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase().nfc().collect()
}

// ── Keypairs ─────────────────────────────────────────────────────────────────

/// Ed25519 keypair. Drop clears the secret via ZeroizeOnDrop.
#[derive(ZeroizeOnDrop)]
pub struct Ed25519KeyPair {
    #[zeroize(skip)]
    public: [u8; 32],
    secret: [u8; 32],
}

impl Ed25519KeyPair {
    /// Mint a fresh random keypair (ephemeral use).
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Deterministic keypair from a 32-byte seed (permanent use).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        Self {
            public: signing.verifying_key().to_bytes(),
            secret: seed,
        }
    }

    pub fn public(&self) -> &[u8; 32] {
        &self.public
    }

    /// Hex form used in envelope `pub_key` fields and token claims.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public)
    }

    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        crate::sign::sign(&self.secret, msg)
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }
}

/// X25519 keypair. The stored seed is clamped by `x25519-dalek` at DH time
/// per RFC 7748.
#[derive(ZeroizeOnDrop)]
pub struct X25519KeyPair {
    #[zeroize(skip)]
    public: [u8; 32],
    secret: [u8; 32],
}

impl X25519KeyPair {
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let secret = StaticSecret::from(seed);
        Self {
            public: X25519Public::from(&secret).to_bytes(),
            secret: seed,
        }
    }

    pub fn public(&self) -> &[u8; 32] {
        &self.public
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.public)
    }

    /// Rebuild the DH secret for a key-agreement operation.
    pub fn secret(&self) -> StaticSecret {
        StaticSecret::from(self.secret)
    }
}

// ── Permanent user keys ──────────────────────────────────────────────────────

/// A user's permanent keypairs. Private halves never leave the client.
pub struct UserKeys {
    pub signing: Ed25519KeyPair,
    pub agreement: X25519KeyPair,
}

/// Derive the permanent Ed25519 + X25519 keypairs for
/// `(email, privkey_context)`. Deterministic, pure, idempotent.
pub fn derive_user_keys(email: &str, privkey_context: &[u8; 32]) -> UserKeys {
    let normalized = normalize_email(email);
    let seed_ed = kdf32("ed25519_seed", privkey_context, normalized.as_bytes());
    let seed_x = kdf32("x25519_seed", privkey_context, normalized.as_bytes());
    UserKeys {
        signing: Ed25519KeyPair::from_seed(seed_ed),
        agreement: X25519KeyPair::from_seed(seed_x),
    }
}

/// Stable 16-byte user id under the server master key. Server-side only.
pub fn user_id(master: &[u8; 32], email: &str) -> [u8; USER_ID_LEN] {
    kdf_array::<USER_ID_LEN>("user_id_v1", master, normalize_email(email).as_bytes())
}
