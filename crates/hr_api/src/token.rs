//! Stateless access tokens.
//!
//! Wire form `base64url(canonical claims JSON) "." base58(sig64)`, signed
//! by an Ed25519 key derived from the master key. Validation is pure: a
//! signature check plus an expiry comparison, no storage round trip.
//!
//! Claims bind the session's ephemeral public key, so an access token also
//! tells the server which key must have signed the accompanying envelope.

use serde::{Deserialize, Serialize};

use hr_crypto::codec::{b58_decode, b58_encode, b64url_decode, b64url_encode};
use hr_crypto::identity::Ed25519KeyPair;
use hr_crypto::kdf::kdf32;
use hr_proto::canonical::to_canonical_json;
use hr_proto::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Base58 of the 16-byte user id.
    pub sub: String,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Hex Ed25519 ephemeral public key the session's envelopes are signed
    /// with.
    pub pub_key: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<[u8; 16], ApiError> {
        let bytes = b58_decode(&self.sub)?;
        bytes.try_into().map_err(|_| ApiError::Unauthenticated)
    }

    pub fn pub_key_bytes(&self) -> Result<[u8; 32], ApiError> {
        let bytes = hex::decode(&self.pub_key).map_err(|_| ApiError::Unauthenticated)?;
        bytes.try_into().map_err(|_| ApiError::Unauthenticated)
    }
}

fn token_signing_key(master: &[u8; 32]) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(kdf32("access_token", master, b"signing-key-v1"))
}

/// Mint a token for `user_id` bound to the session's ephemeral public key.
pub fn mint(
    master: &[u8; 32],
    user_id: &[u8; 16],
    session_pub_key_hex: &str,
    expires_at: i64,
) -> Result<String, ApiError> {
    let claims = AccessClaims {
        sub: b58_encode(user_id),
        exp: expires_at,
        pub_key: session_pub_key_hex.to_string(),
    };
    let encoded = b64url_encode(to_canonical_json(&claims)?.as_bytes());
    let sig = token_signing_key(master).sign(encoded.as_bytes());
    Ok(format!("{encoded}.{}", b58_encode(&sig)))
}

/// Validate signature then expiry; returns the claims.
pub fn validate(master: &[u8; 32], token: &str, now: i64) -> Result<AccessClaims, ApiError> {
    let (encoded, sig_b58) = token.split_once('.').ok_or(ApiError::Unauthenticated)?;

    let sig = b58_decode(sig_b58).map_err(|_| ApiError::Unauthenticated)?;
    let key = token_signing_key(master);
    hr_crypto::sign::verify(key.public(), encoded.as_bytes(), &sig)
        .map_err(|_| ApiError::Unauthenticated)?;

    let claims: AccessClaims =
        serde_json::from_slice(&b64url_decode(encoded).map_err(|_| ApiError::Unauthenticated)?)
            .map_err(|_| ApiError::Unauthenticated)?;

    if claims.exp <= now {
        return Err(ApiError::Unauthenticated);
    }
    Ok(claims)
}
