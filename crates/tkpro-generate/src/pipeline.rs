//! Sequential batch content generation.
//!
//! A [`BatchPipeline`] owns one job per selected product, seeded from
//! persisted results so reopening a batch resumes it. Jobs run strictly in
//! queue order, one external call at a time. Each terminal result is written
//! back as a whole record and persisted before the next job starts, so an
//! interrupted run loses at most the job that was in flight.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tkpro_core::{BatchProgress, BatchResult, BatchStatus, Product};

use crate::client::GenerationClient;
use crate::content::parse_bilingual;
use crate::error::PipelineError;
use crate::prompt::{batch_prompt, BATCH_TEMPERATURE};
use crate::store::ResultStore;

/// Message recorded on every failed job.
pub const GENERATION_FAILED_MESSAGE: &str = "generation failed; check network or retry";

/// Receives each whole-record job transition.
pub type ProgressObserver = Box<dyn Fn(&BatchResult) + Send + Sync>;

/// Cooperative cancellation flag, checked between jobs only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counts from one [`BatchPipeline::run_batch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchRunSummary {
    /// Jobs a generation call was made for.
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    /// Jobs already completed, or in flight elsewhere.
    pub skipped: usize,
    pub cancelled: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a product id as in flight until dropped.
struct InFlight<'a> {
    ids: &'a Mutex<HashSet<String>>,
    id: String,
}

impl<'a> InFlight<'a> {
    fn claim(ids: &'a Mutex<HashSet<String>>, id: &str) -> Option<Self> {
        lock(ids).insert(id.to_owned()).then(|| Self {
            ids,
            id: id.to_owned(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.ids).remove(&self.id);
    }
}

/// Sequential bilingual-copy generation over a fixed queue of products.
///
/// At most one generation per product id runs at a time, but only among
/// callers sharing this value. Two processes (say a `batch run` and a
/// `batch regenerate` in separate shells) each open their own pipeline over
/// the same store and are not excluded from one another.
pub struct BatchPipeline {
    client: Arc<dyn GenerationClient>,
    store: Arc<dyn ResultStore>,
    jobs: Mutex<Vec<BatchResult>>,
    in_flight: Mutex<HashSet<String>>,
    cancel: CancelToken,
    observer: Option<ProgressObserver>,
}

impl BatchPipeline {
    /// Builds the queue for `products`, in order, seeding each job from its
    /// persisted result when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persist`] if persisted results cannot be
    /// loaded.
    pub async fn open(
        client: Arc<dyn GenerationClient>,
        store: Arc<dyn ResultStore>,
        products: &[Product],
    ) -> Result<Self, PipelineError> {
        let mut persisted = store.load_results().await.map_err(PipelineError::Persist)?;
        let jobs: Vec<BatchResult> = products
            .iter()
            .map(|product| {
                persisted
                    .remove(&product.id)
                    .map_or_else(|| BatchResult::pending(product), BatchResult::into_resumable)
            })
            .collect();

        let progress = BatchProgress::tally(&jobs);
        tracing::info!(
            total = progress.total,
            completed = progress.completed,
            failed = progress.failed,
            "opened batch"
        );

        Ok(Self {
            client,
            store,
            jobs: Mutex::new(jobs),
            in_flight: Mutex::new(HashSet::new()),
            cancel: CancelToken::default(),
            observer: None,
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(&BatchResult) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// A handle that stops the current run before its next job.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current job records in queue order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BatchResult> {
        lock(&self.jobs).clone()
    }

    #[must_use]
    pub fn job(&self, product_id: &str) -> Option<BatchResult> {
        lock(&self.jobs)
            .iter()
            .find(|job| job.product_id() == product_id)
            .cloned()
    }

    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        BatchProgress::tally(lock(&self.jobs).iter())
    }

    /// Runs every job that is not yet completed, in queue order.
    ///
    /// Individual generation failures are recorded on their job and the run
    /// moves on. Cancellation is honoured between jobs; the job in flight
    /// finishes first. Calling this again resumes at the first job that is
    /// not completed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingCredential`] before touching any job
    /// when the client has no API key, and [`PipelineError::Persist`] if a
    /// terminal result cannot be persisted.
    pub async fn run_batch(&self) -> Result<BatchRunSummary, PipelineError> {
        if !self.client.has_credential() {
            return Err(PipelineError::MissingCredential);
        }
        self.cancel.reset();

        let ids: Vec<String> = lock(&self.jobs)
            .iter()
            .map(|job| job.product_id().to_owned())
            .collect();
        let mut summary = BatchRunSummary::default();

        for id in ids {
            if self.cancel.is_cancelled() {
                tracing::info!(next = %id, "batch cancelled");
                summary.cancelled = true;
                break;
            }

            let Some(claim) = InFlight::claim(&self.in_flight, &id) else {
                tracing::warn!(product_id = %id, "job already in flight, skipping");
                summary.skipped += 1;
                continue;
            };
            let Some(job) = self.job(&id) else {
                continue;
            };
            if job.status() == BatchStatus::Completed {
                tracing::debug!(product_id = %id, "job already completed, skipping");
                summary.skipped += 1;
                continue;
            }

            summary.attempted += 1;
            let result = self.process(job).await?;
            drop(claim);

            match result.status() {
                BatchStatus::Completed => summary.completed += 1,
                BatchStatus::Failed => summary.failed += 1,
                BatchStatus::Pending | BatchStatus::Processing => {}
            }
        }

        tracing::info!(
            attempted = summary.attempted,
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "batch run finished"
        );
        Ok(summary)
    }

    /// Regenerates one job regardless of its status or queue position.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingCredential`] without an API key,
    /// [`PipelineError::UnknownProduct`] if the id is not queued,
    /// [`PipelineError::AlreadyInFlight`] while the same id is being
    /// generated elsewhere, and [`PipelineError::Persist`] if the result
    /// cannot be persisted.
    pub async fn regenerate(&self, product_id: &str) -> Result<BatchResult, PipelineError> {
        if !self.client.has_credential() {
            return Err(PipelineError::MissingCredential);
        }
        let job = self
            .job(product_id)
            .ok_or_else(|| PipelineError::UnknownProduct(product_id.to_owned()))?;
        let _claim = InFlight::claim(&self.in_flight, product_id)
            .ok_or_else(|| PipelineError::AlreadyInFlight(product_id.to_owned()))?;

        tracing::info!(product_id, previous = %job.status(), "regenerating job");
        self.process(job).await
    }

    /// Generates content for one job and returns its terminal record.
    ///
    /// Never fails: any generation or parse error yields a `failed` record
    /// carrying [`GENERATION_FAILED_MESSAGE`] and no content.
    pub async fn generate_one(&self, job: BatchResult) -> BatchResult {
        let prompt = batch_prompt(job.product_name());
        let outcome = match self
            .client
            .generate_structured(&prompt, BATCH_TEMPERATURE)
            .await
        {
            Ok(raw) => parse_bilingual(&raw),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(content) => job.into_completed(content.en, content.zh),
            Err(e) => {
                tracing::warn!(product_id = %job.product_id(), error = %e, "generation failed");
                job.into_failed(GENERATION_FAILED_MESSAGE)
            }
        }
    }

    /// `processing`, generate, write back, persist. The caller holds the
    /// in-flight claim.
    async fn process(&self, job: BatchResult) -> Result<BatchResult, PipelineError> {
        let processing = job.into_processing();
        tracing::info!(product_id = %processing.product_id(), status = %processing.status(), "job started");
        self.replace(&processing);

        let result = self.generate_one(processing).await;
        self.replace(&result);
        tracing::info!(product_id = %result.product_id(), status = %result.status(), "job finished");

        self.store
            .save_result(&result)
            .await
            .map_err(PipelineError::Persist)?;
        Ok(result)
    }

    fn replace(&self, record: &BatchResult) {
        {
            let mut jobs = lock(&self.jobs);
            if let Some(slot) = jobs
                .iter_mut()
                .find(|job| job.product_id() == record.product_id())
            {
                slot.clone_from(record);
            }
        }
        if let Some(observer) = &self.observer {
            observer(record);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
