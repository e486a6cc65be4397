//! Client key material.
//!
//! Ephemeral keys sign request envelopes and receive the encrypted
//! `privkey_context`; they rotate with the session window. Permanent keys
//! are pure functions of `(email, privkey_context)` — losing local storage
//! loses nothing.

use zeroize::Zeroizing;

use hr_crypto::aead;
use hr_crypto::codec::b64url_decode;
use hr_crypto::ecdh;
use hr_crypto::identity::{derive_user_keys, Ed25519KeyPair, UserKeys, X25519KeyPair};
use hr_crypto::kdf::kdf32;
use hr_proto::api::KeysRotateRequest;
use hr_proto::ApiError;

/// Sistema A: one ephemeral Ed25519 + X25519 pair per session window.
pub struct EphemeralKeys {
    pub signing: Ed25519KeyPair,
    pub agreement: X25519KeyPair,
}

impl EphemeralKeys {
    pub fn mint() -> Self {
        Self {
            signing: Ed25519KeyPair::generate(),
            agreement: X25519KeyPair::generate(),
        }
    }
}

/// Decrypt the `privkey_context` delivered in the login response:
/// ECDH between our ephemeral X25519 secret and the server's session
/// X25519 key, then AEAD over `nonce ‖ ciphertext ‖ tag`.
pub fn recover_privkey_context(
    ephemeral: &EphemeralKeys,
    server_x25519_pub_hex: &str,
    encrypted_privkey_context: &str,
) -> Result<Zeroizing<[u8; 32]>, ApiError> {
    let server_pub = ecdh::public_from_bytes(
        &hex::decode(server_x25519_pub_hex).map_err(|_| ApiError::InvalidEncoding)?,
    )?;
    let shared = ecdh::dh(&ephemeral.agreement.secret(), &server_pub)?;
    let seal_key = kdf32("privkey_context_seal", &shared, b"");

    let blob = b64url_decode(encrypted_privkey_context)?;
    if blob.len() < 12 {
        return Err(ApiError::DecryptionFailed);
    }
    let (nonce, ciphertext) = blob.split_at(12);
    let nonce: [u8; 12] = nonce.try_into().expect("split_at(12)");
    let plaintext = aead::open(&seal_key, &nonce, b"privkey_context_v1", ciphertext)?;

    let context: [u8; 32] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| ApiError::DecryptionFailed)?;
    Ok(Zeroizing::new(context))
}

/// Sistema B: derive the permanent keypairs and the publication payload
/// for `/keys/rotate`.
pub fn permanent_keys(email: &str, privkey_context: &[u8; 32]) -> (UserKeys, KeysRotateRequest) {
    let keys = derive_user_keys(email, privkey_context);
    let request = KeysRotateRequest {
        ed25519_pub_key: keys.signing.public_hex(),
        x25519_pub_key: keys.agreement.public_hex(),
    };
    (keys, request)
}
