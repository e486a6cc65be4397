//! The encrypted secret payload.
//!
//! Canonical JSON sealed under a key derived from the reference hash. This
//! ciphertext is the only place either email address is stored; both vanish
//! when the rows do, and the rows cannot outlive `expires_at` (≤ 72 h).
//!
//! The nonce is the reference hash prefix: the key is unique per reference,
//! so the (key, nonce) pair never repeats.

use serde::{Deserialize, Serialize};

use hr_crypto::aead;
use hr_crypto::kdf::kdf32;
use hr_proto::canonical::to_canonical_json;
use hr_proto::ApiError;

use super::REFERENCE_HASH_LEN;

const PAYLOAD_AAD: &[u8] = b"secret_v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretPayload {
    pub sender_email: String,
    pub receiver_email: String,
    pub secret_text: String,
    /// 9-digit numeric gate, present iff the secret requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    pub created_at: i64,
}

pub fn seal(
    master: &[u8; 32],
    reference_hash: &[u8; REFERENCE_HASH_LEN],
    payload: &SecretPayload,
) -> Result<Vec<u8>, ApiError> {
    let key = kdf32("payload_key", master, reference_hash);
    let nonce: [u8; 12] = reference_hash[..12].try_into().expect("32 >= 12");
    let json = to_canonical_json(payload)?;
    Ok(aead::seal(&key, &nonce, PAYLOAD_AAD, json.as_bytes())?)
}

pub fn open(
    master: &[u8; 32],
    reference_hash: &[u8; REFERENCE_HASH_LEN],
    ciphertext: &[u8],
) -> Result<SecretPayload, ApiError> {
    let key = kdf32("payload_key", master, reference_hash);
    let nonce: [u8; 12] = reference_hash[..12].try_into().expect("32 >= 12");
    let plaintext = aead::open(&key, &nonce, PAYLOAD_AAD, ciphertext)?;
    serde_json::from_slice(&plaintext).map_err(|_| ApiError::DecryptionFailed)
}
