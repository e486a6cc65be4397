//! Client-side confirm-read cache.
//!
//! Keyed by the Base58 URL hash. A page reload within the retention window
//! consults this table before issuing another decrement-causing view, and
//! replays the cached OTP so the user is not prompted twice. Cleared in
//! full on logout.

use crate::error::StoreError;
use crate::models::ConfirmReadRow;
use crate::Store;

impl Store {
    /// Record the first successful view of `url_hash`. Later calls keep the
    /// original `first_view_at` but may fill in a newly learned OTP.
    pub async fn confirm_read_record(
        &self,
        url_hash: &str,
        now: i64,
        otp: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO confirm_read_cache (url_hash, first_view_at, cached_otp) \
             VALUES (?, ?, ?) \
             ON CONFLICT (url_hash) DO UPDATE SET \
                 cached_otp = COALESCE(excluded.cached_otp, cached_otp)",
        )
        .bind(url_hash)
        .bind(now)
        .bind(otp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn confirm_read_get(
        &self,
        url_hash: &str,
    ) -> Result<Option<ConfirmReadRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM confirm_read_cache WHERE url_hash = ?")
            .bind(url_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Logout wipes the cache entirely.
    pub async fn confirm_read_clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM confirm_read_cache")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
