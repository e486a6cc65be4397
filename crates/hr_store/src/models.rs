//! Database row models — these map to/from SQL rows.
//!
//! Timestamps are unix seconds; the store never consults a clock, callers
//! pass `now` explicitly.

use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct MagicLinkRow {
    /// Keyed hash of the raw emailed token (the raw token is never stored).
    pub token_hash: Vec<u8>,
    /// AEAD ciphertext of the login email, key derived from the raw token.
    pub email_enc: Vec<u8>,
    pub ui_host: String,
    pub next: Option<String>,
    /// Hex Ed25519 ephemeral public key from the login request.
    pub pub_key: String,
    /// Hex X25519 ephemeral public key from the login request.
    pub x25519_pub_key: String,
    pub email_lang: String,
    pub expires_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshRecordRow {
    /// Keyed hash of the opaque cookie token.
    pub token_hash: Vec<u8>,
    /// 16-byte user id.
    pub user_id: Vec<u8>,
    pub ephemeral_ed25519_pub: String,
    pub ephemeral_x25519_pub: String,
    /// Start of the current window; bumped only on rotation.
    pub issued_at: i64,
    pub refresh_exp: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserKeysRow {
    pub user_id: Vec<u8>,
    /// Hex permanent Ed25519 public key (Sistema B, derived client-side).
    pub ed25519_pub: String,
    pub x25519_pub: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SharedSecretRow {
    /// 32-byte per-role storage key.
    pub db_index: Vec<u8>,
    pub encrypted_payload: Vec<u8>,
    pub expires_at: i64,
    /// "sender" | "receiver"
    pub role: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TrackingRow {
    /// 32-byte identifier shared by both role views.
    pub reference_hash: Vec<u8>,
    /// Receiver reads remaining; monotonically non-increasing.
    pub pending_reads: i64,
    pub max_reads: i64,
    /// Set once, on the first successful receiver decryption.
    pub read_at: Option<i64>,
    pub expires_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ConfirmReadRow {
    pub url_hash: String,
    pub first_view_at: i64,
    pub cached_otp: Option<String>,
}
