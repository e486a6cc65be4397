//! Error taxonomy
//!
//! One kind per failure class, each with an HTTP status and a translatable
//! message key. Envelope/crypto rejections deliberately do not discriminate
//! beyond the kind; user-visible messages are keys for the translation
//! tables, never raw internal text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hr_crypto::CryptoError;

/// Per-field reason inside a `Validation` error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid checksum")]
    InvalidChecksum,

    #[error("invalid encoding")]
    InvalidEncoding,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("not authenticated")]
    Unauthenticated,

    #[error("refresh window exceeded")]
    RefreshExpired,

    /// `key` refines the reason for the client ("forbidden", "otp_required",
    /// "invalid_otp") without changing the HTTP mapping.
    #[error("forbidden")]
    Forbidden { key: &'static str },

    #[error("not found")]
    NotFound,

    #[error("gone")]
    Gone,

    #[error("validation failed")]
    Validation { fields: Vec<FieldError> },

    #[error("already consumed")]
    Conflict,

    #[error("storage unavailable")]
    TransientStorage,

    #[error("email delivery unavailable")]
    TransientEmail,
}

impl ApiError {
    pub fn forbidden() -> Self {
        ApiError::Forbidden { key: "forbidden" }
    }

    pub fn otp_required() -> Self {
        ApiError::Forbidden { key: "otp_required" }
    }

    pub fn invalid_otp() -> Self {
        ApiError::Forbidden { key: "invalid_otp" }
    }

    pub fn validation(field: &str, reason: &str) -> Self {
        ApiError::Validation {
            fields: vec![FieldError {
                field: field.to_string(),
                reason: reason.to_string(),
            }],
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::InvalidSignature | ApiError::DecryptionFailed => 401,
            ApiError::InvalidChecksum | ApiError::InvalidEncoding => 400,
            ApiError::Unauthenticated | ApiError::RefreshExpired => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::NotFound => 404,
            ApiError::Gone => 410,
            ApiError::Validation { .. } => 400,
            ApiError::Conflict => 409,
            ApiError::TransientStorage | ApiError::TransientEmail => 503,
        }
    }

    /// Stable key for the client-side translation tables.
    pub fn message_key(&self) -> &'static str {
        match self {
            ApiError::InvalidSignature => "error.invalid_signature",
            ApiError::InvalidChecksum => "error.invalid_checksum",
            ApiError::InvalidEncoding => "error.invalid_encoding",
            ApiError::DecryptionFailed => "error.decryption_failed",
            ApiError::Unauthenticated => "error.unauthenticated",
            ApiError::RefreshExpired => "error.refresh_expired",
            ApiError::Forbidden { key: "otp_required" } => "error.otp_required",
            ApiError::Forbidden { key: "invalid_otp" } => "error.invalid_otp",
            ApiError::Forbidden { .. } => "error.forbidden",
            ApiError::NotFound => "error.not_found",
            ApiError::Gone => "error.gone",
            ApiError::Validation { .. } => "error.validation",
            ApiError::Conflict => "error.conflict",
            ApiError::TransientStorage => "error.transient_storage",
            ApiError::TransientEmail => "error.transient_email",
        }
    }

    /// Safe to retry without user interaction.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::TransientStorage | ApiError::TransientEmail)
    }

    /// Wire body for an error response.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.message_key().to_string(),
            code: self.http_status(),
            fields: match self {
                ApiError::Validation { fields } => Some(fields.clone()),
                _ => None,
            },
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidSignature => ApiError::InvalidSignature,
            CryptoError::DecryptionFailed => ApiError::DecryptionFailed,
            CryptoError::InvalidEncoding | CryptoError::InvalidLength => {
                ApiError::InvalidEncoding
            }
        }
    }
}

/// JSON body accompanying a non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}
