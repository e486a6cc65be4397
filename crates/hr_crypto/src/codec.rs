//! Wire encodings
//!
//! Base58 (Bitcoin alphabet, no `0OIl`) for human-visible identifiers:
//! magic tokens, URL hashes, signatures. URL-safe Base64 without padding
//! for envelope payloads.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::CryptoError;

pub fn b58_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

pub fn b58_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    bs58::decode(s)
        .into_vec()
        .map_err(|_| CryptoError::InvalidEncoding)
}

/// Base58-decode a value whose byte length is fixed by the protocol.
pub fn b58_decode_array<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = b58_decode(s)?;
    bytes.try_into().map_err(|_| CryptoError::InvalidLength)
}

pub fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn b64url_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|_| CryptoError::InvalidEncoding)
}
