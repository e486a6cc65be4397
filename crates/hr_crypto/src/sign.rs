//! Ed25519 signing and verification
//!
//! Verification uses `verify_strict`, which rejects signatures with
//! non-canonical scalars and small-order components. Malleable variants of
//! a once-valid signature therefore do not verify.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::error::CryptoError;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

/// Sign `msg` with a 32-byte Ed25519 seed; returns the raw 64-byte signature.
pub fn sign(secret: &[u8; 32], msg: &[u8]) -> [u8; SIGNATURE_LEN] {
    SigningKey::from_bytes(secret).sign(msg).to_bytes()
}

/// Public key for a 32-byte Ed25519 seed.
pub fn public_key(secret: &[u8; 32]) -> [u8; PUBLIC_KEY_LEN] {
    SigningKey::from_bytes(secret).verifying_key().to_bytes()
}

/// Strict verification of a 64-byte signature over `msg`.
pub fn verify(public: &[u8; 32], msg: &[u8], sig: &[u8]) -> Result<(), CryptoError> {
    let sig: &[u8; SIGNATURE_LEN] = sig.try_into().map_err(|_| CryptoError::InvalidLength)?;
    let vk = VerifyingKey::from_bytes(public).map_err(|_| CryptoError::InvalidSignature)?;
    vk.verify_strict(msg, &Signature::from_bytes(sig))
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let secret = [42u8; 32];
        let public = public_key(&secret);
        let sig = sign(&secret, b"hello");
        assert!(verify(&public, b"hello", &sig).is_ok());
    }

    #[test]
    fn flipped_bit_fails() {
        let secret = [42u8; 32];
        let public = public_key(&secret);
        let mut sig = sign(&secret, b"hello");
        sig[10] ^= 0x01;
        assert_eq!(
            verify(&public, b"hello", &sig),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn wrong_message_fails() {
        let secret = [42u8; 32];
        let public = public_key(&secret);
        let sig = sign(&secret, b"hello");
        assert!(verify(&public, b"hullo", &sig).is_err());
    }

    #[test]
    fn truncated_signature_is_length_error() {
        let secret = [42u8; 32];
        let public = public_key(&secret);
        let sig = sign(&secret, b"hello");
        assert_eq!(
            verify(&public, b"hello", &sig[..63]),
            Err(CryptoError::InvalidLength)
        );
    }
}
