//! X25519 key agreement
//!
//! RFC 7748 scalars are clamped by `x25519-dalek` during the DH operation.
//! Outputs from low-order peer points are rejected via the contributory
//! check, so a malicious peer cannot force a predictable shared secret.

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Diffie-Hellman over X25519. Rejects non-contributory results
/// (all-zero shared secret from a low-order public key).
pub fn dh(secret: &StaticSecret, public: &PublicKey) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let shared = secret.diffie_hellman(public);
    if !shared.was_contributory() {
        return Err(CryptoError::DecryptionFailed);
    }
    Ok(Zeroizing::new(shared.to_bytes()))
}

/// Rebuild a `StaticSecret` from a stored 32-byte seed.
pub fn secret_from_bytes(bytes: &[u8; 32]) -> StaticSecret {
    StaticSecret::from(*bytes)
}

/// Parse a peer public key from raw bytes.
pub fn public_from_bytes(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidLength)?;
    Ok(PublicKey::from(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_agree() {
        let a = StaticSecret::from([11u8; 32]);
        let b = StaticSecret::from([22u8; 32]);
        let a_pub = PublicKey::from(&a);
        let b_pub = PublicKey::from(&b);

        let ab = dh(&a, &b_pub).unwrap();
        let ba = dh(&b, &a_pub).unwrap();
        assert_eq!(*ab, *ba);
    }

    #[test]
    fn low_order_point_is_rejected() {
        // The identity point: DH output is all zeros, not contributory.
        let a = StaticSecret::from([11u8; 32]);
        let identity = PublicKey::from([0u8; 32]);
        assert_eq!(dh(&a, &identity), Err(CryptoError::DecryptionFailed));
    }
}
