//! API request/response types shared between clients and the service.
//! These map directly to the (enveloped) JSON bodies on the wire.
//!
//! Key encodings: Ed25519/X25519 public keys are hex (64 chars); signatures
//! and opaque identifiers (magic tokens, URL hashes, user ids, references)
//! are Base58; binary blobs inside payloads are URL-safe Base64 without
//! padding. Timestamps are unix seconds.

use serde::{Deserialize, Serialize};

// ── Roles ────────────────────────────────────────────────────────────────────

/// Role in the shared-secret relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretRole {
    /// Creator of the secret — unlimited reads, owns the cascade delete.
    Sender,
    /// Recipient — limited reads, may delete only its own view.
    Receiver,
}

impl SecretRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SecretRole::Sender => "sender",
            SecretRole::Receiver => "receiver",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sender" => Some(SecretRole::Sender),
            "receiver" => Some(SecretRole::Receiver),
            _ => None,
        }
    }

    /// Single byte used inside the URL fingerprint.
    pub fn to_byte(self) -> u8 {
        match self {
            SecretRole::Sender => 0,
            SecretRole::Receiver => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(SecretRole::Sender),
            1 => Some(SecretRole::Receiver),
            _ => None,
        }
    }
}

// ── Login / session ──────────────────────────────────────────────────────────

/// `POST /api/login/` — request a magic link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    /// Host the magic link lands on (`https://{ui_host}/?magiclink=…`).
    pub ui_host: String,
    /// Optional in-app destination, replayed verbatim after login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// BCP-47 tag for the email body.
    pub email_lang: String,
    /// Client ephemeral Ed25519 public key, hex. Signs this envelope.
    pub pub_key: String,
    /// Client ephemeral X25519 public key, hex. Receives the encrypted
    /// `privkey_context` in the magic-link response.
    pub x25519_pub_key: String,
}

/// Response to a magic-link request. The email is the only egress of the
/// address itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkSentResponse {
    pub status: String,
}

/// `POST /api/login/magiclink/` — consume a magic link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkConsumeRequest {
    /// Base58 token lifted from the `?magiclink=` query parameter.
    pub magiclink: String,
}

/// Session established by magic-link consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub access_token: String,
    /// Base58 of the 16-byte user id.
    pub user_id: String,
    /// Access-token expiry, unix seconds.
    pub expires_at: i64,
    /// Server per-session Ed25519 public key, hex. Pin for response checks.
    pub server_pub_key: String,
    /// Server per-session X25519 public key, hex.
    pub server_x25519_pub_key: String,
    /// `privkey_context` sealed to the client's ephemeral X25519 key
    /// (base64url of nonce ‖ ciphertext ‖ tag).
    pub encrypted_privkey_context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// `POST /api/refresh` — always carries fresh pubkeys; the server decides
/// whether to rotate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub new_ed25519_pub_key: String,
    pub new_x25519_pub_key: String,
}

/// Refresh result. `server_pub_key` is present if and only if the server
/// rotated; the client rotates its own keypairs exactly then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_pub_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_x25519_pub_key: Option<String>,
}

/// `DELETE /api/login` — logout. The payload is empty; the envelope exists
/// so the request is still attributable to the session key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub status: String,
}

/// `POST /api/keys/rotate` — publish permanent (derived) public keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysRotateRequest {
    pub ed25519_pub_key: String,
    pub x25519_pub_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysRotateResponse {
    pub status: String,
}

// ── Shared secrets ───────────────────────────────────────────────────────────

/// `POST /api/shared-secret` — create a secret pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub sender_email: String,
    pub receiver_email: String,
    /// At most 512 bytes of UTF-8.
    pub secret_text: String,
    /// 1..=72; defaults to 24 when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_hours: Option<i64>,
    /// 1..=10; defaults to 3 when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reads: Option<i64>,
    #[serde(default)]
    pub require_otp: bool,
    #[serde(default)]
    pub send_copy_to_sender: bool,
    pub receiver_language: String,
    pub sender_language: String,
    pub ui_host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretResponse {
    /// `https://{ui_host}/shared-secret/{base58(url_hash)}` for the sender.
    pub url_sender: String,
    /// Same, for the receiver. Unlinkable to `url_sender` without the key.
    pub url_receiver: String,
    /// Base58 of the 32-byte reference hash.
    pub reference: String,
    /// The 9-digit OTP, present iff the secret was created with
    /// `require_otp` (the same OTP gates the receiver and the sender copy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

/// `GET /api/shared-secret/{url_hash}` — view result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSecretResponse {
    pub secret_text: String,
    pub sender_email: String,
    pub receiver_email: String,
    /// Remaining receiver reads; −1 when the viewer is the sender.
    pub pending_reads: i64,
    pub max_reads: i64,
    pub expires_at: i64,
    pub reference: String,
    pub role: SecretRole,
}

/// `DELETE /api/shared-secret/{url_hash}` — the payload repeats the path's
/// URL hash so the signature covers the deletion target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSecretRequest {
    pub url_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSecretResponse {
    pub status: String,
    pub role: SecretRole,
}

// ── Exempt (unwrapped) endpoints ─────────────────────────────────────────────

/// `GET /api/version` — plain JSON, not enveloped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// `GET /api/test/dry-run?enabled=` — test-only email suppression toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRunToggleResponse {
    pub enabled: bool,
}
