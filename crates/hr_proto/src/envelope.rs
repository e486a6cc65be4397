//! Signed envelope — the wrapper around every non-exempt request/response.
//!
//! Shape: `{ payload: base64url(canonical JSON), signature: base58(sig64) }`.
//!
//! The signed bytes are the Base64 payload *string*, not the JSON it
//! decodes to, so a verifier needs no canonicalization agreement beyond the
//! encoding itself. Rejection is a hard fail: nothing inside an envelope is
//! acted upon before its signature verifies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use hr_crypto::codec::{b58_decode, b58_encode, b64url_decode, b64url_encode};

use crate::canonical::to_canonical_json;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Base64url-encoded canonical JSON (the exact signed bytes).
    pub payload: String,
    /// Base58-encoded 64-byte Ed25519 signature over `payload`.
    pub signature: String,
}

/// Canonicalize, encode, and sign `payload` with an Ed25519 secret.
pub fn seal<T: Serialize>(signing_secret: &[u8; 32], payload: &T) -> Result<SignedEnvelope, ApiError> {
    let json = to_canonical_json(payload)?;
    let encoded = b64url_encode(json.as_bytes());
    let sig = hr_crypto::sign::sign(signing_secret, encoded.as_bytes());
    Ok(SignedEnvelope {
        payload: encoded,
        signature: b58_encode(&sig),
    })
}

/// Verify the envelope against `public` and deserialize its payload.
pub fn verify_and_open<T: DeserializeOwned>(
    envelope: &SignedEnvelope,
    public: &[u8; 32],
) -> Result<T, ApiError> {
    let sig = b58_decode(&envelope.signature)?;
    hr_crypto::sign::verify(public, envelope.payload.as_bytes(), &sig)?;
    decode_payload(envelope)
}

/// Verify an envelope whose signing key travels *inside* the payload as a
/// hex `pub_key` field (unauthenticated endpoints: login, first touch).
/// Returns the payload and the recovered key so the caller can bind the
/// session to it.
pub fn verify_with_embedded_key<T: DeserializeOwned>(
    envelope: &SignedEnvelope,
) -> Result<(T, [u8; 32]), ApiError> {
    let raw: serde_json::Value = decode_payload(envelope)?;
    let pub_hex = raw
        .get("pub_key")
        .and_then(|v| v.as_str())
        .ok_or(ApiError::InvalidSignature)?;
    let public: [u8; 32] = hex::decode(pub_hex)
        .map_err(|_| ApiError::InvalidEncoding)?
        .try_into()
        .map_err(|_| ApiError::InvalidEncoding)?;

    let sig = b58_decode(&envelope.signature)?;
    hr_crypto::sign::verify(&public, envelope.payload.as_bytes(), &sig)?;

    let payload = serde_json::from_value(raw).map_err(|_| ApiError::InvalidEncoding)?;
    Ok((payload, public))
}

/// Decode the payload WITHOUT verifying the signature.
///
/// Only for the magic-link consumption flow, where the signing key is bound
/// to the stored link record and can be looked up only after reading the
/// token from the payload. The caller MUST verify the envelope against the
/// recovered key before committing any state.
pub fn decode_unverified<T: DeserializeOwned>(envelope: &SignedEnvelope) -> Result<T, ApiError> {
    decode_payload(envelope)
}

fn decode_payload<T: DeserializeOwned>(envelope: &SignedEnvelope) -> Result<T, ApiError> {
    let json = b64url_decode(&envelope.payload)?;
    serde_json::from_slice(&json).map_err(|_| ApiError::InvalidEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_crypto::identity::Ed25519KeyPair;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        email: String,
        pub_key: String,
        seq: u64,
    }

    fn sample(keys: &Ed25519KeyPair) -> Ping {
        Ping {
            email: "alice@example.com".into(),
            pub_key: keys.public_hex(),
            seq: 42,
        }
    }

    #[test]
    fn seal_verify_roundtrip() {
        let keys = Ed25519KeyPair::generate();
        let msg = sample(&keys);
        let env = seal(keys.secret_bytes(), &msg).unwrap();
        let opened: Ping = verify_and_open(&env, keys.public()).unwrap();
        assert_eq!(opened, msg);
    }

    #[test]
    fn payload_tamper_fails() {
        let keys = Ed25519KeyPair::generate();
        let mut env = seal(keys.secret_bytes(), &sample(&keys)).unwrap();
        // Flip one character of the Base64 payload string.
        let mut bytes = env.payload.into_bytes();
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        env.payload = String::from_utf8(bytes).unwrap();
        assert!(matches!(
            verify_and_open::<Ping>(&env, keys.public()),
            Err(ApiError::InvalidSignature | ApiError::InvalidEncoding)
        ));
    }

    #[test]
    fn signature_tamper_fails() {
        let keys = Ed25519KeyPair::generate();
        let env = seal(keys.secret_bytes(), &sample(&keys)).unwrap();
        let mut sig = b58_decode(&env.signature).unwrap();
        sig[5] ^= 0x01;
        let env = SignedEnvelope {
            payload: env.payload,
            signature: b58_encode(&sig),
        };
        assert_eq!(
            verify_and_open::<Ping>(&env, keys.public()).unwrap_err(),
            ApiError::InvalidSignature
        );
    }

    #[test]
    fn wrong_key_fails() {
        let keys = Ed25519KeyPair::generate();
        let other = Ed25519KeyPair::generate();
        let env = seal(keys.secret_bytes(), &sample(&keys)).unwrap();
        assert_eq!(
            verify_and_open::<Ping>(&env, other.public()).unwrap_err(),
            ApiError::InvalidSignature
        );
    }

    #[test]
    fn embedded_key_recovery() {
        let keys = Ed25519KeyPair::generate();
        let msg = sample(&keys);
        let env = seal(keys.secret_bytes(), &msg).unwrap();
        let (opened, public) = verify_with_embedded_key::<Ping>(&env).unwrap();
        assert_eq!(opened, msg);
        assert_eq!(&public, keys.public());
    }

    #[test]
    fn embedded_key_signed_by_someone_else_fails() {
        let keys = Ed25519KeyPair::generate();
        let attacker = Ed25519KeyPair::generate();
        // Payload claims `keys`' public key but is signed by the attacker.
        let msg = sample(&keys);
        let env = seal(attacker.secret_bytes(), &msg).unwrap();
        assert_eq!(
            verify_with_embedded_key::<Ping>(&env).unwrap_err(),
            ApiError::InvalidSignature
        );
    }

    #[test]
    fn missing_pub_key_field_is_rejected() {
        #[derive(Serialize)]
        struct NoKey {
            email: String,
        }
        let keys = Ed25519KeyPair::generate();
        let env = seal(
            keys.secret_bytes(),
            &NoKey {
                email: "a@b.c".into(),
            },
        )
        .unwrap();
        assert_eq!(
            verify_with_embedded_key::<serde_json::Value>(&env).unwrap_err(),
            ApiError::InvalidSignature
        );
    }
}
