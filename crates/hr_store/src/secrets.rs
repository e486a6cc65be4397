//! Shared secret rows and the tracking counter.
//!
//! Invariants enforced here:
//! - A secret pair and its tracking row are created in one transaction, so
//!   there is never a live pair without exactly one tracking row.
//! - The read decrement is conditional (`pending_reads > 0`), so concurrent
//!   viewers cannot drive the counter negative.
//! - `read_at` is set once and never overwritten.

use crate::error::StoreError;
use crate::models::{SharedSecretRow, TrackingRow};
use crate::Store;

impl Store {
    /// Insert both role rows and the tracking row atomically.
    pub async fn secret_insert_pair(
        &self,
        sender: &SharedSecretRow,
        receiver: &SharedSecretRow,
        tracking: &TrackingRow,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for row in [sender, receiver] {
            sqlx::query(
                "INSERT INTO shared_secrets (db_index, encrypted_payload, expires_at, role) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&row.db_index)
            .bind(&row.encrypted_payload)
            .bind(row.expires_at)
            .bind(&row.role)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO shared_secrets_tracking \
             (reference_hash, pending_reads, max_reads, read_at, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&tracking.reference_hash)
        .bind(tracking.pending_reads)
        .bind(tracking.max_reads)
        .bind(tracking.read_at)
        .bind(tracking.expires_at)
        .bind(tracking.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn secret_get(
        &self,
        db_index: &[u8],
    ) -> Result<Option<SharedSecretRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM shared_secrets WHERE db_index = ?")
            .bind(db_index)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn tracking_get(
        &self,
        reference_hash: &[u8],
    ) -> Result<Option<TrackingRow>, StoreError> {
        let row =
            sqlx::query_as("SELECT * FROM shared_secrets_tracking WHERE reference_hash = ?")
                .bind(reference_hash)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    /// Consume one receiver read. Returns false when nothing was consumed
    /// (counter already at zero, or no tracking row), so racing viewers get
    /// at most `max_reads` successful decrements between them.
    pub async fn tracking_consume_read(
        &self,
        reference_hash: &[u8],
        now: i64,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE shared_secrets_tracking \
             SET pending_reads = pending_reads - 1, \
                 read_at = COALESCE(read_at, ?) \
             WHERE reference_hash = ? AND pending_reads > 0",
        )
        .bind(now)
        .bind(reference_hash)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Sender cascade: remove the sender's row and the tracking row. The
    /// receiver row is reaped lazily by the next view that finds no
    /// tracking.
    pub async fn secret_delete_cascade(
        &self,
        sender_db_index: &[u8],
        reference_hash: &[u8],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM shared_secrets WHERE db_index = ?")
            .bind(sender_db_index)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM shared_secrets_tracking WHERE reference_hash = ?")
            .bind(reference_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a single role row (receiver self-delete, orphan cleanup).
    pub async fn secret_delete_row(&self, db_index: &[u8]) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM shared_secrets WHERE db_index = ?")
            .bind(db_index)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a secret row together with its tracking row (expiry path).
    pub async fn secret_delete_with_tracking(
        &self,
        db_index: &[u8],
        reference_hash: &[u8],
    ) -> Result<(), StoreError> {
        self.secret_delete_cascade(db_index, reference_hash).await
    }

    /// Drop everything past its expiry. Returns (secret rows, tracking rows)
    /// removed.
    pub async fn secrets_sweep_expired(&self, now: i64) -> Result<(u64, u64), StoreError> {
        let secrets = sqlx::query("DELETE FROM shared_secrets WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        let tracking =
            sqlx::query("DELETE FROM shared_secrets_tracking WHERE expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok((secrets, tracking))
    }
}
