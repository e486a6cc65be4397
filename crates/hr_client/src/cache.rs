//! Per-device confirm-read cache.
//!
//! A receiver view decrements the shared counter; a page reload must not
//! decrement again. The UI consults this cache before re-issuing a
//! decrement-causing view, and the session replays the cached OTP so the
//! user is not prompted twice. Logout clears everything.

use hr_store::models::ConfirmReadRow;
use hr_store::Store;

use crate::error::ClientError;

#[derive(Clone)]
pub struct ConfirmReadCache {
    store: Store,
}

impl ConfirmReadCache {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn lookup(&self, url_hash: &str) -> Result<Option<ConfirmReadRow>, ClientError> {
        Ok(self.store.confirm_read_get(url_hash).await?)
    }

    /// True when this device already consumed a read for `url_hash`.
    pub async fn has_viewed(&self, url_hash: &str) -> Result<bool, ClientError> {
        Ok(self.lookup(url_hash).await?.is_some())
    }

    pub async fn record_view(
        &self,
        url_hash: &str,
        now: i64,
        otp: Option<&str>,
    ) -> Result<(), ClientError> {
        Ok(self.store.confirm_read_record(url_hash, now, otp).await?)
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        Ok(self.store.confirm_read_clear().await?)
    }
}
