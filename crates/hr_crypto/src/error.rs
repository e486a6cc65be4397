use thiserror::Error;

/// Crypto failures expose a kind and nothing else. Messages are fixed
/// strings so no input-derived detail can leak into logs or responses.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signature verification failed")]
    InvalidSignature,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid encoding")]
    InvalidEncoding,

    #[error("invalid length")]
    InvalidLength,
}
