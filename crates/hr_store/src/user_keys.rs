//! Published permanent public keys.

use crate::error::StoreError;
use crate::models::UserKeysRow;
use crate::Store;

impl Store {
    /// Publish (or replace) a user's permanent public keys.
    pub async fn user_keys_upsert(&self, row: &UserKeysRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_keys (user_id, ed25519_pub, x25519_pub, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 ed25519_pub = excluded.ed25519_pub, \
                 x25519_pub = excluded.x25519_pub, \
                 updated_at = excluded.updated_at",
        )
        .bind(&row.user_id)
        .bind(&row.ed25519_pub)
        .bind(&row.x25519_pub)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn user_keys_get(&self, user_id: &[u8]) -> Result<Option<UserKeysRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM user_keys WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
