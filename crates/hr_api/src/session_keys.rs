//! Per-session server keypairs.
//!
//! The server holds no long-lived signing key for responses. For each
//! session it derives an Ed25519 (response signing) and an X25519
//! (privkey-context delivery) keypair from the master key, the user id,
//! and the client's current ephemeral public key. The derivation is
//! repeatable on every request, so nothing needs storing, and it changes
//! exactly when the client's ephemeral key rotates — which is what lets
//! the client pin `server_pub_key` between rotations.

use hr_crypto::identity::{Ed25519KeyPair, X25519KeyPair};
use hr_crypto::kdf::kdf32;
use hr_proto::ApiError;

fn session_input(user_id: &[u8; 16], client_ed_pub_hex: &str) -> Result<Vec<u8>, ApiError> {
    let client_pub = hex::decode(client_ed_pub_hex).map_err(|_| ApiError::InvalidEncoding)?;
    if client_pub.len() != 32 {
        return Err(ApiError::InvalidEncoding);
    }
    let mut input = Vec::with_capacity(48);
    input.extend_from_slice(user_id);
    input.extend_from_slice(&client_pub);
    Ok(input)
}

/// Ed25519 keypair that signs every response of this session.
pub fn server_signing_key(
    master: &[u8; 32],
    user_id: &[u8; 16],
    client_ed_pub_hex: &str,
) -> Result<Ed25519KeyPair, ApiError> {
    let input = session_input(user_id, client_ed_pub_hex)?;
    Ok(Ed25519KeyPair::from_seed(kdf32("server_session", master, &input)))
}

/// X25519 keypair for ECDH against the client's ephemeral X25519 key.
pub fn server_agreement_key(
    master: &[u8; 32],
    user_id: &[u8; 16],
    client_ed_pub_hex: &str,
) -> Result<X25519KeyPair, ApiError> {
    let input = session_input(user_id, client_ed_pub_hex)?;
    Ok(X25519KeyPair::from_seed(kdf32(
        "server_session_x25519",
        master,
        &input,
    )))
}
