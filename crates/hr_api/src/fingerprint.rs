//! URL fingerprints — the opaque routing token inside secret-sharing URLs.
//!
//! 40-byte plaintext layout:
//!
//! ```text
//! reference_hash(32) ‖ checksum(7) ‖ role(1)
//! ```
//!
//! The checksum is the truncated keyed MAC of
//! `reference_hash ‖ user_id ‖ role`, so it binds the full 16-byte user id
//! without carrying it. The whole token is then XORed with a ChaCha20
//! keystream fixed per deployment (key and nonce expanded from the master
//! key). Checksum-inside-encryption: forging or redirecting a token
//! requires the master key, and the decoder rejects anything that fails
//! the constant-time MAC check — tampering and a viewer presenting someone
//! else's URL are indistinguishable by design.
//!
//! Two tokens are minted per secret (sender and receiver); they share
//! `reference_hash` but differ in the user-binding checksum and role byte.

use hr_crypto::aead::xor_keystream;
use hr_crypto::codec::{b58_decode_array, b58_encode};
use hr_crypto::ct::ct_eq;
use hr_crypto::kdf::kdf_array;
use hr_proto::api::SecretRole;
use hr_proto::ApiError;

pub const URL_HASH_LEN: usize = 40;
const CHECKSUM_LEN: usize = 7;

fn mac_input(reference_hash: &[u8; 32], user_id: &[u8; 16], role: SecretRole) -> [u8; 49] {
    let mut input = [0u8; 49];
    input[..32].copy_from_slice(reference_hash);
    input[32..48].copy_from_slice(user_id);
    input[48] = role.to_byte();
    input
}

fn keystream_material(master: &[u8; 32]) -> ([u8; 32], [u8; 12]) {
    let material = kdf_array::<44>("url_fingerprint_cipher", master, b"static");
    let mut key = [0u8; 32];
    let mut nonce = [0u8; 12];
    key.copy_from_slice(&material[..32]);
    nonce.copy_from_slice(&material[32..]);
    (key, nonce)
}

/// Build the Base58 URL hash for one role view of a secret.
pub fn encode(
    master: &[u8; 32],
    reference_hash: &[u8; 32],
    user_id: &[u8; 16],
    role: SecretRole,
) -> String {
    let checksum =
        kdf_array::<CHECKSUM_LEN>("url_fingerprint_mac", master, &mac_input(reference_hash, user_id, role));

    let mut token = [0u8; URL_HASH_LEN];
    token[..32].copy_from_slice(reference_hash);
    token[32..39].copy_from_slice(&checksum);
    token[39] = role.to_byte();

    let (key, nonce) = keystream_material(master);
    xor_keystream(&key, &nonce, &mut token);
    b58_encode(&token)
}

/// Decrypt and validate a URL hash for the viewer identified by `user_id`
/// (taken from the access token). Returns the reference hash and role.
pub fn decode(
    master: &[u8; 32],
    url_hash: &str,
    user_id: &[u8; 16],
) -> Result<([u8; 32], SecretRole), ApiError> {
    let mut token: [u8; URL_HASH_LEN] = b58_decode_array(url_hash)?;

    let (key, nonce) = keystream_material(master);
    xor_keystream(&key, &nonce, &mut token);

    let mut reference_hash = [0u8; 32];
    reference_hash.copy_from_slice(&token[..32]);
    let role = SecretRole::from_byte(token[39]).ok_or(ApiError::InvalidChecksum)?;

    let expected =
        kdf_array::<CHECKSUM_LEN>("url_fingerprint_mac", master, &mac_input(&reference_hash, user_id, role));
    if !ct_eq(&token[32..39], &expected) {
        return Err(ApiError::InvalidChecksum);
    }

    Ok((reference_hash, role))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: [u8; 32] = [0x77; 32];

    #[test]
    fn encode_decode_roundtrip_both_roles() {
        let reference = [3u8; 32];
        let user = [4u8; 16];
        for role in [SecretRole::Sender, SecretRole::Receiver] {
            let hash = encode(&MASTER, &reference, &user, role);
            let (got_ref, got_role) = decode(&MASTER, &hash, &user).unwrap();
            assert_eq!(got_ref, reference);
            assert_eq!(got_role, role);
        }
    }

    #[test]
    fn role_views_are_distinct_tokens() {
        let reference = [3u8; 32];
        let sender = encode(&MASTER, &reference, &[4u8; 16], SecretRole::Sender);
        let receiver = encode(&MASTER, &reference, &[5u8; 16], SecretRole::Receiver);
        assert_ne!(sender, receiver);
    }

    #[test]
    fn wrong_user_fails_the_checksum() {
        let hash = encode(&MASTER, &[3u8; 32], &[4u8; 16], SecretRole::Receiver);
        assert_eq!(
            decode(&MASTER, &hash, &[9u8; 16]).unwrap_err(),
            ApiError::InvalidChecksum
        );
    }

    #[test]
    fn tampered_token_fails_the_checksum() {
        let hash = encode(&MASTER, &[3u8; 32], &[4u8; 16], SecretRole::Sender);
        let mut raw = hr_crypto::codec::b58_decode(&hash).unwrap();
        raw[0] ^= 0x01;
        let tampered = hr_crypto::codec::b58_encode(&raw);
        assert!(decode(&MASTER, &tampered, &[4u8; 16]).is_err());
    }

    #[test]
    fn wrong_master_cannot_decode() {
        let hash = encode(&MASTER, &[3u8; 32], &[4u8; 16], SecretRole::Sender);
        assert!(decode(&[0x78; 32], &hash, &[4u8; 16]).is_err());
    }

    #[test]
    fn malformed_base58_is_an_encoding_error() {
        assert_eq!(
            decode(&MASTER, "0OIl", &[4u8; 16]).unwrap_err(),
            ApiError::InvalidEncoding
        );
        // Valid Base58 of the wrong length
        let short = b58_encode(&[1u8; 10]);
        assert_eq!(
            decode(&MASTER, &short, &[4u8; 16]).unwrap_err(),
            ApiError::InvalidEncoding
        );
    }
}
