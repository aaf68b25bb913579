use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tkpro_core::GeneratedContent;

use super::*;
use crate::client::PartialSink;
use crate::error::GenerationError;
use crate::store::{MemoryResultStore, StoreFailure};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

type Reply = Result<String, GenerationError>;

/// Replays canned replies in order and records each prompt it was given.
#[derive(Default)]
struct ScriptedClient {
    no_credential: bool,
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, f64)>>,
    cancel_on_call: Mutex<Option<CancelToken>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn push(&self, reply: Reply) {
        lock(&self.replies).push_back(reply);
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn has_credential(&self) -> bool {
        !self.no_credential
    }

    async fn stream_text(
        &self,
        prompt: &str,
        temperature: f64,
        _on_partial: Option<PartialSink<'_>>,
    ) -> Result<String, GenerationError> {
        lock(&self.calls).push((prompt.to_owned(), temperature));
        if let Some(token) = lock(&self.cancel_on_call).as_ref() {
            token.cancel();
        }
        lock(&self.replies)
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }

    async fn search_text(&self, _prompt: &str, _temperature: f64) -> Reply {
        Ok(String::new())
    }
}

/// Yields to the scheduler in the middle of every call and records the
/// highest number of overlapping calls seen for one prompt.
#[derive(Default)]
struct YieldingClient {
    active: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
    max_overlap: AtomicUsize,
}

#[async_trait]
impl GenerationClient for YieldingClient {
    fn has_credential(&self) -> bool {
        true
    }

    async fn stream_text(
        &self,
        prompt: &str,
        _temperature: f64,
        _on_partial: Option<PartialSink<'_>>,
    ) -> Result<String, GenerationError> {
        let overlap = {
            let mut active = lock(&self.active);
            let count = active.entry(prompt.to_owned()).or_insert(0);
            *count += 1;
            *count
        };
        self.max_overlap.fetch_max(overlap, Ordering::SeqCst);
        lock(&self.calls).push(prompt.to_owned());

        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        if let Some(count) = lock(&self.active).get_mut(prompt) {
            *count -= 1;
        }
        ok("yield")
    }

    async fn search_text(&self, _prompt: &str, _temperature: f64) -> Reply {
        Ok(String::new())
    }
}

struct FailingStore;

#[async_trait]
impl ResultStore for FailingStore {
    async fn load_results(&self) -> Result<HashMap<String, BatchResult>, StoreFailure> {
        Ok(HashMap::new())
    }

    async fn save_result(&self, _result: &BatchResult) -> Result<(), StoreFailure> {
        Err("disk full".into())
    }
}

fn ok(tag: &str) -> Reply {
    Ok(format!(
        r#"```json
{{"title_en":"{tag} EN","title_zh":"{tag} 中文","description_en":"d","description_zh":"d","script_en":"s","script_zh":"s"}}
```"#
    ))
}

fn api_error() -> Reply {
    Err(GenerationError::Api {
        status: 500,
        message: "internal".into(),
    })
}

fn products() -> Vec<Product> {
    vec![
        Product::new("p-0", "Galaxy Projector", 24.99, 12_500.0),
        Product::new("p-1", "Shapewear", 18.5, 8_900.0),
        Product::new("p-2", "Pet Brush", 12.0, 300.0),
    ]
}

fn content(title: &str) -> GeneratedContent {
    GeneratedContent {
        title: title.into(),
        description: "d".into(),
        script: "s".into(),
    }
}

async fn open(client: &Arc<ScriptedClient>, store: &Arc<MemoryResultStore>) -> BatchPipeline {
    BatchPipeline::open(client.clone(), store.clone(), &products())
        .await
        .expect("open should succeed")
}

fn statuses(pipeline: &BatchPipeline) -> Vec<BatchStatus> {
    pipeline.snapshot().iter().map(BatchResult::status).collect()
}

// ---------------------------------------------------------------------------
// run_batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failure_in_the_middle_does_not_halt_the_queue() {
    let client = ScriptedClient::new(vec![ok("a"), api_error(), ok("c")]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;

    let summary = pipeline.run_batch().await.unwrap();

    assert_eq!(
        statuses(&pipeline),
        vec![
            BatchStatus::Completed,
            BatchStatus::Failed,
            BatchStatus::Completed
        ]
    );
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);

    let failed = pipeline.job("p-1").unwrap();
    assert_eq!(failed.error_msg(), Some(GENERATION_FAILED_MESSAGE));
    assert!(failed.content_en().is_none());
    assert!(failed.content_zh().is_none());

    let done = pipeline.job("p-0").unwrap();
    assert_eq!(done.content_en().unwrap().title, "a EN");
    assert_eq!(done.content_zh().unwrap().title, "a 中文");

    assert_eq!(store.get("p-1").unwrap().status(), BatchStatus::Failed);
    assert_eq!(store.history().len(), 3);
}

#[tokio::test]
async fn unparseable_reply_fails_the_job() {
    let client = ScriptedClient::new(vec![
        Ok("I'm sorry, I can't do that.".into()),
        Ok(r#"{"title_en": "only one key"}"#.into()),
        ok("c"),
    ]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;

    pipeline.run_batch().await.unwrap();

    assert_eq!(
        statuses(&pipeline),
        vec![
            BatchStatus::Failed,
            BatchStatus::Failed,
            BatchStatus::Completed
        ]
    );
}

#[tokio::test]
async fn prompt_names_product_and_uses_batch_temperature() {
    let client = ScriptedClient::new(vec![ok("a"), ok("b"), ok("c")]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;

    pipeline.run_batch().await.unwrap();

    let calls = lock(&client.calls).clone();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].0.contains("\"Galaxy Projector\""));
    assert!(calls[2].0.contains("\"Pet Brush\""));
    assert!(calls
        .iter()
        .all(|(_, t)| (t - BATCH_TEMPERATURE).abs() < f64::EPSILON));
}

#[tokio::test]
async fn second_run_skips_completed_jobs() {
    let client = ScriptedClient::new(vec![ok("a"), api_error(), ok("c")]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;
    pipeline.run_batch().await.unwrap();
    let first = pipeline.job("p-0").unwrap();

    client.push(ok("b"));
    let summary = pipeline.run_batch().await.unwrap();

    assert_eq!(client.call_count(), 4);
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(pipeline.job("p-0").unwrap(), first);
    assert_eq!(pipeline.progress().completed, 3);
}

#[tokio::test]
async fn missing_credential_aborts_before_any_job() {
    let client = Arc::new(ScriptedClient {
        no_credential: true,
        ..ScriptedClient::default()
    });
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;

    let err = pipeline.run_batch().await.unwrap_err();

    assert!(matches!(err, PipelineError::MissingCredential));
    assert_eq!(client.call_count(), 0);
    assert_eq!(pipeline.progress().pending, 3);
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn cancellation_stops_before_the_next_job_and_resumes() {
    let client = ScriptedClient::new(vec![ok("a"), ok("b"), ok("c")]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;
    *lock(&client.cancel_on_call) = Some(pipeline.cancel_token());

    let summary = pipeline.run_batch().await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.attempted, 1);
    assert_eq!(
        statuses(&pipeline),
        vec![
            BatchStatus::Completed,
            BatchStatus::Pending,
            BatchStatus::Pending
        ]
    );
    assert_eq!(store.history().len(), 1);

    *lock(&client.cancel_on_call) = None;
    let summary = pipeline.run_batch().await.unwrap();
    assert!(!summary.cancelled);
    assert_eq!(summary.attempted, 2);
    assert_eq!(pipeline.progress().completed, 3);
}

#[tokio::test]
async fn persist_failure_aborts_the_run() {
    let client = ScriptedClient::new(vec![ok("a"), ok("b"), ok("c")]);
    let pipeline = BatchPipeline::open(client.clone(), Arc::new(FailingStore), &products())
        .await
        .unwrap();

    let err = pipeline.run_batch().await.unwrap_err();

    assert!(matches!(err, PipelineError::Persist(_)));
    assert_eq!(client.call_count(), 1);
    assert!(lock(&pipeline.in_flight).is_empty());
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_resumes_from_persisted_results() {
    let done = BatchResult::pending_for("p-0", "Galaxy Projector")
        .into_completed(content("saved en"), content("saved zh"));
    let store = Arc::new(MemoryResultStore::with_results([done.clone()]));
    let client = ScriptedClient::new(vec![ok("b"), ok("c")]);
    let pipeline = open(&client, &store).await;

    assert_eq!(pipeline.job("p-0").unwrap(), done);
    let summary = pipeline.run_batch().await.unwrap();

    assert_eq!(client.call_count(), 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(pipeline.job("p-0").unwrap(), done);
}

#[tokio::test]
async fn persisted_processing_record_is_requeued() {
    let stuck = BatchResult::pending_for("p-2", "Pet Brush").into_processing();
    let store = Arc::new(MemoryResultStore::with_results([stuck]));
    let client = ScriptedClient::new(Vec::new());
    let pipeline = open(&client, &store).await;

    assert_eq!(pipeline.job("p-2").unwrap().status(), BatchStatus::Pending);
}

#[tokio::test]
async fn results_for_unselected_products_are_ignored() {
    let other = BatchResult::pending_for("p-9", "Other").into_failed("x");
    let store = Arc::new(MemoryResultStore::with_results([other]));
    let client = ScriptedClient::new(Vec::new());
    let pipeline = open(&client, &store).await;

    assert_eq!(pipeline.snapshot().len(), 3);
    assert!(pipeline.job("p-9").is_none());
}

// ---------------------------------------------------------------------------
// regenerate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn regenerate_recovers_a_failed_job() {
    let client = ScriptedClient::new(vec![ok("a"), api_error(), ok("c")]);
    let store = Arc::new(MemoryResultStore::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let pipeline = open(&client, &store)
        .await
        .with_observer(move |r: &BatchResult| lock(&sink).push((r.product_id().to_owned(), r.status())));
    pipeline.run_batch().await.unwrap();
    lock(&seen).clear();

    client.push(ok("b2"));
    let result = pipeline.regenerate("p-1").await.unwrap();

    assert_eq!(result.status(), BatchStatus::Completed);
    assert_eq!(result.content_en().unwrap().title, "b2 EN");
    assert!(result.error_msg().is_none());
    assert_eq!(
        *lock(&seen),
        vec![
            ("p-1".to_owned(), BatchStatus::Processing),
            ("p-1".to_owned(), BatchStatus::Completed)
        ]
    );
    assert!(store.history().iter().all(|r| r.status().is_terminal()));
    assert_eq!(store.get("p-1").unwrap(), result);
}

#[tokio::test]
async fn regenerate_can_fail_a_completed_job() {
    let client = ScriptedClient::new(vec![ok("a"), ok("b"), ok("c"), api_error()]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;
    pipeline.run_batch().await.unwrap();

    let result = pipeline.regenerate("p-0").await.unwrap();

    assert_eq!(result.status(), BatchStatus::Failed);
    assert!(result.content_en().is_none());
    assert_eq!(pipeline.progress().failed, 1);
}

#[tokio::test]
async fn regenerate_unknown_product_is_an_error() {
    let client = ScriptedClient::new(Vec::new());
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;

    let err = pipeline.regenerate("p-42").await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownProduct(id) if id == "p-42"));
}

#[tokio::test]
async fn same_id_is_never_generated_twice_at_once() {
    let client = ScriptedClient::new(vec![ok("a"), ok("c")]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;

    let claim = InFlight::claim(&pipeline.in_flight, "p-1").unwrap();
    let err = pipeline.regenerate("p-1").await.unwrap_err();
    assert!(matches!(err, PipelineError::AlreadyInFlight(_)));

    let summary = pipeline.run_batch().await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(pipeline.job("p-1").unwrap().status(), BatchStatus::Pending);

    drop(claim);
    assert!(InFlight::claim(&pipeline.in_flight, "p-1").is_some());
}

#[tokio::test]
async fn concurrent_run_and_regenerate_share_one_call_per_id() {
    let client = Arc::new(YieldingClient::default());
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = BatchPipeline::open(client.clone(), store.clone(), &products())
        .await
        .expect("open should succeed");

    let (summary, regenerated) = tokio::join!(pipeline.run_batch(), pipeline.regenerate("p-1"));
    let summary = summary.unwrap();
    let regenerated = regenerated.unwrap();

    assert_eq!(client.max_overlap.load(Ordering::SeqCst), 1);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(regenerated.status(), BatchStatus::Completed);

    let shapewear = batch_prompt("Shapewear");
    let shapewear_calls = lock(&client.calls)
        .iter()
        .filter(|prompt| **prompt == shapewear)
        .count();
    assert_eq!(shapewear_calls, 1);
    assert!(statuses(&pipeline)
        .iter()
        .all(|status| *status == BatchStatus::Completed));
}

// ---------------------------------------------------------------------------
// generate_one
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_one_returns_terminal_record_without_persisting() {
    let client = ScriptedClient::new(vec![ok("solo")]);
    let store = Arc::new(MemoryResultStore::default());
    let pipeline = open(&client, &store).await;

    let job = BatchResult::pending_for("x", "Standalone").into_processing();
    let result = pipeline.generate_one(job).await;

    assert_eq!(result.status(), BatchStatus::Completed);
    assert_eq!(result.product_id(), "x");
    assert!(store.history().is_empty());
}
