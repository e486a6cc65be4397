use thiserror::Error;

use hr_proto::ApiError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not logged in")]
    NotLoggedIn,

    /// Refresh window exhausted; the UI surfaces "session expired, please
    /// log in again".
    #[error("session expired")]
    SessionExpired,

    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-2xx response; `key` is the server's translatable message key.
    #[error("server rejected request: {key} (http {status})")]
    Server { status: u16, key: String },

    /// Local envelope/crypto failure (bad server signature, undecodable
    /// payload, privkey-context decryption failure).
    #[error(transparent)]
    Protocol(#[from] ApiError),

    #[error("local store failure: {0}")]
    Cache(#[from] hr_store::StoreError),
}
