//! Raw key→value access.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::StoreError;

/// Current role: `"user"` or `"admin"`.
pub const ROLE_KEY: &str = "tk_pro_role";
/// API key supplied by the user.
pub const API_KEY_KEY: &str = "tk_pro_key";
/// Avatar image as inline data.
pub const AVATAR_KEY: &str = "tk_pro_avatar";
/// Fingerprint of the catalog the stored batch results belong to.
pub const CATALOG_FINGERPRINT_KEY: &str = "tk_pro_catalog_fingerprint";

/// A row from the `kv_store` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KvRow {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn get_entry(pool: &SqlitePool, key: &str) -> Result<Option<KvRow>, StoreError> {
    let row = sqlx::query_as::<_, KvRow>(
        "SELECT key, value, updated_at FROM kv_store WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the query fails.
pub async fn get_value(pool: &SqlitePool, key: &str) -> Result<Option<String>, StoreError> {
    Ok(get_entry(pool, key).await?.map(|row| row.value))
}

/// Inserts or replaces `key`.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the write fails.
pub async fn set_value(pool: &SqlitePool, key: &str, value: &str) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Removes `key`. Removing an absent key is not an error.
///
/// # Errors
///
/// Returns [`StoreError::Sqlx`] if the delete fails.
pub async fn delete_value(pool: &SqlitePool, key: &str) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM kv_store WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalStore;

    #[tokio::test]
    async fn absent_key_reads_none() {
        let store = LocalStore::in_memory().await.unwrap();
        assert!(get_value(store.pool(), "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites_and_delete_removes() {
        let store = LocalStore::in_memory().await.unwrap();
        let pool = store.pool();

        set_value(pool, "k", "one").await.unwrap();
        set_value(pool, "k", "two").await.unwrap();
        let entry = get_entry(pool, "k").await.unwrap().unwrap();
        assert_eq!(entry.value, "two");
        assert!(entry.updated_at <= Utc::now());

        delete_value(pool, "k").await.unwrap();
        delete_value(pool, "k").await.unwrap();
        assert!(get_value(pool, "k").await.unwrap().is_none());
    }
}
