//! Single-use magic-link records.

use crate::error::StoreError;
use crate::models::MagicLinkRow;
use crate::Store;

impl Store {
    pub async fn magic_link_insert(&self, row: &MagicLinkRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO magic_links \
             (token_hash, email_enc, ui_host, next, pub_key, x25519_pub_key, \
              email_lang, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.token_hash)
        .bind(&row.email_enc)
        .bind(&row.ui_host)
        .bind(&row.next)
        .bind(&row.pub_key)
        .bind(&row.x25519_pub_key)
        .bind(&row.email_lang)
        .bind(row.expires_at)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Non-destructive lookup. Consumption verifies the request signature
    /// against the stored `pub_key` before burning the link, so fetch and
    /// delete are separate steps.
    pub async fn magic_link_get(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<MagicLinkRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM magic_links WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Burn the link. Returns false when another consumer got there first —
    /// the single-use gate under concurrency.
    pub async fn magic_link_delete(&self, token_hash: &[u8]) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM magic_links WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn magic_links_purge_expired(&self, now: i64) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM magic_links WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(token_hash: Vec<u8>) -> MagicLinkRow {
        MagicLinkRow {
            token_hash,
            email_enc: vec![1, 2, 3],
            ui_host: "app.test".into(),
            next: Some("/".into()),
            pub_key: "aa".repeat(32),
            x25519_pub_key: "bb".repeat(32),
            email_lang: "en".into(),
            expires_at: 1_000,
            created_at: 100,
        }
    }

    #[tokio::test]
    async fn delete_is_single_use() {
        let store = Store::open_in_memory().await.unwrap();
        store.magic_link_insert(&row(vec![7u8; 32])).await.unwrap();

        let found = store.magic_link_get(&[7u8; 32]).await.unwrap();
        assert_eq!(found.unwrap().ui_host, "app.test");

        assert!(store.magic_link_delete(&[7u8; 32]).await.unwrap());
        assert!(!store.magic_link_delete(&[7u8; 32]).await.unwrap());
        assert!(store.magic_link_get(&[7u8; 32]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let store = Store::open_in_memory().await.unwrap();
        let mut live = row(vec![1u8; 32]);
        live.expires_at = 2_000;
        store.magic_link_insert(&live).await.unwrap();
        store.magic_link_insert(&row(vec![2u8; 32])).await.unwrap();

        let purged = store.magic_links_purge_expired(1_500).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.magic_link_get(&[1u8; 32]).await.unwrap().is_some());
    }
}
