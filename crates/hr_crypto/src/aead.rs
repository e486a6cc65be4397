//! Authenticated encryption and the URL-token keystream
//!
//! ChaCha20-Poly1305 (96-bit nonce, 128-bit tag). Nonces are supplied by
//! the caller: HashRand derives them deterministically (payload nonces come
//! from `reference_hash`, URL-token nonces from the master key), so the
//! random-nonce-prepended wire format common in E2EE messengers does not
//! apply here.
//!
//! `xor_keystream` exposes raw ChaCha20 for the fixed-size URL fingerprint,
//! whose integrity comes from an inner keyed-MAC checksum instead of a
//! Poly1305 tag (the token must stay exactly 40 bytes).

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use zeroize::Zeroizing;

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext`; returns `ciphertext || tag`.
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
    cipher
        .encrypt(nonce.into(), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Decrypt `ciphertext || tag`. Authentication failure and malformed input
/// are indistinguishable to the caller.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher =
        ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
    let plaintext = cipher
        .decrypt(nonce.into(), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(Zeroizing::new(plaintext))
}

/// XOR `data` in place with the ChaCha20 keystream for `(key, nonce)`.
/// Encrypt and decrypt are the same operation.
pub fn xor_keystream(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], data: &mut [u8]) {
    let mut cipher = ChaCha20::new(key.into(), nonce.into());
    cipher.apply_keystream(data);
}
