//! Refresh session records.

use crate::error::StoreError;
use crate::models::RefreshRecordRow;
use crate::Store;

impl Store {
    pub async fn refresh_insert(&self, row: &RefreshRecordRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO refresh_records \
             (token_hash, user_id, ephemeral_ed25519_pub, ephemeral_x25519_pub, \
              issued_at, refresh_exp) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.token_hash)
        .bind(&row.user_id)
        .bind(&row.ephemeral_ed25519_pub)
        .bind(&row.ephemeral_x25519_pub)
        .bind(row.issued_at)
        .bind(row.refresh_exp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn refresh_get(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<RefreshRecordRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM refresh_records WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Rotation: retire the old cookie token and store the replacement
    /// record in one transaction. The old cookie stops working immediately.
    pub async fn refresh_rotate(
        &self,
        old_token_hash: &[u8],
        new_row: &RefreshRecordRow,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM refresh_records WHERE token_hash = ?")
            .bind(old_token_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO refresh_records \
             (token_hash, user_id, ephemeral_ed25519_pub, ephemeral_x25519_pub, \
              issued_at, refresh_exp) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_row.token_hash)
        .bind(&new_row.user_id)
        .bind(&new_row.ephemeral_ed25519_pub)
        .bind(&new_row.ephemeral_x25519_pub)
        .bind(new_row.issued_at)
        .bind(new_row.refresh_exp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn refresh_delete(&self, token_hash: &[u8]) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_records WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn refresh_purge_expired(&self, now: i64) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM refresh_records WHERE refresh_exp <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(token_hash: Vec<u8>, issued_at: i64) -> RefreshRecordRow {
        RefreshRecordRow {
            token_hash,
            user_id: vec![9u8; 16],
            ephemeral_ed25519_pub: "cc".repeat(32),
            ephemeral_x25519_pub: "dd".repeat(32),
            issued_at,
            refresh_exp: issued_at + 259_200,
        }
    }

    #[tokio::test]
    async fn rotate_replaces_the_record() {
        let store = Store::open_in_memory().await.unwrap();
        store.refresh_insert(&record(vec![1u8; 32], 100)).await.unwrap();

        let new = record(vec![2u8; 32], 200);
        store.refresh_rotate(&[1u8; 32], &new).await.unwrap();

        assert!(store.refresh_get(&[1u8; 32]).await.unwrap().is_none());
        let stored = store.refresh_get(&[2u8; 32]).await.unwrap().unwrap();
        assert_eq!(stored.issued_at, 200);
    }

    #[tokio::test]
    async fn delete_revokes() {
        let store = Store::open_in_memory().await.unwrap();
        store.refresh_insert(&record(vec![3u8; 32], 100)).await.unwrap();
        store.refresh_delete(&[3u8; 32]).await.unwrap();
        assert!(store.refresh_get(&[3u8; 32]).await.unwrap().is_none());
    }
}
