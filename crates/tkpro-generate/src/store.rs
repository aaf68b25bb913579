//! Persistence seam for batch results.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tkpro_core::BatchResult;

/// Boxed error from a [`ResultStore`] implementation.
pub type StoreFailure = Box<dyn std::error::Error + Send + Sync>;

/// Where the pipeline reads seeded results from and writes terminal results
/// to. Each save replaces the whole record for its product id.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// All persisted results keyed by product id. Absent data is an empty
    /// map, not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreFailure`] if the backing store cannot be read.
    async fn load_results(&self) -> Result<HashMap<String, BatchResult>, StoreFailure>;

    /// # Errors
    ///
    /// Returns a [`StoreFailure`] if the record cannot be written.
    async fn save_result(&self, result: &BatchResult) -> Result<(), StoreFailure>;
}

/// In-process [`ResultStore`] that also records every save in order.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<HashMap<String, BatchResult>>,
    history: Mutex<Vec<BatchResult>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryResultStore {
    #[must_use]
    pub fn with_results(results: impl IntoIterator<Item = BatchResult>) -> Self {
        let results = results
            .into_iter()
            .map(|r| (r.product_id().to_owned(), r))
            .collect();
        Self {
            results: Mutex::new(results),
            history: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn get(&self, product_id: &str) -> Option<BatchResult> {
        lock(&self.results).get(product_id).cloned()
    }

    /// Every record passed to `save_result`, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<BatchResult> {
        lock(&self.history).clone()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn load_results(&self) -> Result<HashMap<String, BatchResult>, StoreFailure> {
        Ok(lock(&self.results).clone())
    }

    async fn save_result(&self, result: &BatchResult) -> Result<(), StoreFailure> {
        lock(&self.results).insert(result.product_id().to_owned(), result.clone());
        lock(&self.history).push(result.clone());
        Ok(())
    }
}
