//! Persisted batch results and the catalog they belong to.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tkpro_core::BatchResult;
use tkpro_generate::{ResultStore, StoreFailure};

use crate::kv::{get_value, CATALOG_FINGERPRINT_KEY};
use crate::{LocalStore, StoreError};

/// A row from the `batch_results` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchResultRow {
    pub product_id: String,
    pub status: String,
    /// The whole [`BatchResult`] as JSON.
    pub record: String,
    pub updated_at: DateTime<Utc>,
}

impl BatchResultRow {
    fn decode(&self) -> Result<BatchResult, StoreError> {
        serde_json::from_str(&self.record).map_err(|source| StoreError::Serde {
            key: self.product_id.clone(),
            source,
        })
    }
}

impl LocalStore {
    /// Every stored result keyed by product id. Rows that no longer decode
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the query fails.
    pub async fn batch_results(&self) -> Result<HashMap<String, BatchResult>, StoreError> {
        let rows = sqlx::query_as::<_, BatchResultRow>(
            "SELECT product_id, status, record, updated_at FROM batch_results",
        )
        .fetch_all(self.pool())
        .await?;

        let mut results = HashMap::with_capacity(rows.len());
        for row in rows {
            match row.decode() {
                Ok(result) => {
                    results.insert(row.product_id, result);
                }
                Err(e) => tracing::warn!(product_id = %row.product_id, error = %e, "skipping unreadable batch result"),
            }
        }
        Ok(results)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the query fails and
    /// [`StoreError::Serde`] if the stored record does not decode.
    pub async fn batch_result(&self, product_id: &str) -> Result<Option<BatchResult>, StoreError> {
        let row = sqlx::query_as::<_, BatchResultRow>(
            "SELECT product_id, status, record, updated_at FROM batch_results WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(BatchResultRow::decode).transpose()
    }

    /// Replaces the stored record for `result`'s product id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serde`] if the record cannot be encoded and
    /// [`StoreError::Sqlx`] if the write fails.
    pub async fn save_batch_result(&self, result: &BatchResult) -> Result<(), StoreError> {
        let record = serde_json::to_string(result).map_err(|source| StoreError::Serde {
            key: result.product_id().to_owned(),
            source,
        })?;

        sqlx::query(
            "INSERT INTO batch_results (product_id, status, record, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (product_id) DO UPDATE SET \
                 status = excluded.status, record = excluded.record, updated_at = excluded.updated_at",
        )
        .bind(result.product_id())
        .bind(result.status().to_string())
        .bind(record)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the read fails.
    pub async fn catalog_fingerprint(&self) -> Result<Option<String>, StoreError> {
        get_value(self.pool(), CATALOG_FINGERPRINT_KEY).await
    }

    /// Records `fingerprint` as the active catalog. When it differs from the
    /// stored one, stored batch results belong to other products and are
    /// cleared in the same transaction.
    ///
    /// Returns the number of results cleared.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the transaction fails.
    pub async fn reconcile_catalog(&self, fingerprint: &str) -> Result<u64, StoreError> {
        let mut tx = self.pool().begin().await?;

        let stored: Option<String> =
            sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
                .bind(CATALOG_FINGERPRINT_KEY)
                .fetch_optional(&mut *tx)
                .await?;
        if stored.as_deref() == Some(fingerprint) {
            return Ok(0);
        }

        let cleared = sqlx::query("DELETE FROM batch_results")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(CATALOG_FINGERPRINT_KEY)
        .bind(fingerprint)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        if cleared > 0 {
            tracing::info!(cleared, "catalog changed, cleared stale batch results");
        }
        Ok(cleared)
    }
}

#[async_trait]
impl ResultStore for LocalStore {
    async fn load_results(&self) -> Result<HashMap<String, BatchResult>, StoreFailure> {
        Ok(self.batch_results().await?)
    }

    async fn save_result(&self, result: &BatchResult) -> Result<(), StoreFailure> {
        Ok(self.save_batch_result(result).await?)
    }
}
