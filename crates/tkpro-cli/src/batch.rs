//! Batch generation command handlers for the CLI.
//!
//! `run` and `regenerate` talk to the generation API and persist every
//! terminal result; `status` and `show` only read the local store.

use std::collections::HashMap;
use std::sync::Arc;

use clap::Subcommand;
use tkpro_core::{AppConfig, BatchProgress, BatchResult, BatchStatus, Language, Product};
use tkpro_generate::{BatchPipeline, GeminiClient, GenerationClient, PipelineError};
use tkpro_store::LocalStore;

use crate::catalog::{load_catalog, select_products, CatalogArgs};
use crate::fmt_title;
use crate::session::{generation_client, MISSING_KEY_HINT};

/// Sub-commands available under `batch`.
#[derive(Debug, Subcommand)]
pub enum BatchCommands {
    /// Generate bilingual listing copy for the selected products
    Run {
        #[command(flatten)]
        source: CatalogArgs,
        /// Comma-separated product ids, in the order to generate them
        #[arg(long, value_delimiter = ',', required = true)]
        select: Vec<String>,
    },
    /// Generate one product again, whatever its current status
    Regenerate {
        #[command(flatten)]
        source: CatalogArgs,
        /// Product id to regenerate
        #[arg(long)]
        id: String,
    },
    /// Show stored job states for the catalog
    Status {
        #[command(flatten)]
        source: CatalogArgs,
        /// Comma-separated product ids (defaults to the whole catalog)
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
    },
    /// Print the stored copy for one product
    Show {
        /// Product id
        id: String,
        /// Output language: en or zh
        #[arg(long, default_value = "en")]
        lang: Language,
    },
}

/// Run a `batch` sub-command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the store fails, or
/// generation cannot start.
pub(crate) async fn run_batch_command(
    config: &AppConfig,
    store: &LocalStore,
    command: BatchCommands,
) -> anyhow::Result<()> {
    match command {
        BatchCommands::Run { source, select } => run_batch_run(config, store, &source, &select).await,
        BatchCommands::Regenerate { source, id } => {
            run_batch_regenerate(config, store, &source, &id).await
        }
        BatchCommands::Status { source, select } => run_batch_status(store, &source, &select).await,
        BatchCommands::Show { id, lang } => run_batch_show(store, &id, lang).await,
    }
}

fn with_key_hint(err: PipelineError) -> anyhow::Error {
    match err {
        PipelineError::MissingCredential => anyhow::anyhow!("{err}; {MISSING_KEY_HINT}"),
        other => other.into(),
    }
}

/// Commits the catalog and makes it the one stored results belong to.
async fn active_catalog(store: &LocalStore, source: &CatalogArgs) -> anyhow::Result<Vec<Product>> {
    let catalog = load_catalog(source)?;
    let cleared = store.reconcile_catalog(&catalog.fingerprint()).await?;
    if cleared > 0 {
        println!("catalog changed; cleared {cleared} stored result(s)");
    }
    Ok(catalog.products)
}

/// The session's generation client, refused up front when it has no key so
/// nothing in the store is touched.
async fn keyed_client(config: &AppConfig, store: &LocalStore) -> anyhow::Result<GeminiClient> {
    let client = generation_client(config, store).await?;
    if !client.has_credential() {
        return Err(with_key_hint(PipelineError::MissingCredential));
    }
    Ok(client)
}

async fn open_pipeline(
    client: GeminiClient,
    store: &LocalStore,
    products: &[Product],
) -> anyhow::Result<BatchPipeline> {
    let pipeline = BatchPipeline::open(Arc::new(client), Arc::new(store.clone()), products).await?;
    Ok(pipeline)
}

fn report_transition(job: &BatchResult) {
    match job.status() {
        BatchStatus::Processing => println!("{:<8}generating  {}", job.product_id(), job.product_name()),
        BatchStatus::Completed => println!("{:<8}done", job.product_id()),
        BatchStatus::Failed => println!(
            "{:<8}failed      {}",
            job.product_id(),
            job.error_msg().unwrap_or_default()
        ),
        BatchStatus::Pending => {}
    }
}

fn job_row(job: &BatchResult) -> String {
    let detail = match job.status() {
        BatchStatus::Completed => job
            .content(Language::En)
            .map(|c| fmt_title(&c.title, 40))
            .unwrap_or_default(),
        BatchStatus::Failed => job.error_msg().unwrap_or_default().to_owned(),
        BatchStatus::Pending | BatchStatus::Processing => String::new(),
    };
    format!(
        "{:<8}{:<12}{:<34}{}",
        job.product_id(),
        job.status().to_string(),
        fmt_title(job.product_name(), 30),
        detail
    )
}

fn print_jobs(jobs: &[BatchResult]) {
    let header = format!("{:<8}{:<12}{:<34}DETAIL", "ID", "STATUS", "PRODUCT");
    println!("{header}");
    for job in jobs {
        println!("{}", job_row(job));
    }
    let progress = BatchProgress::tally(jobs);
    println!();
    println!(
        "{} jobs: {} completed, {} failed, {} pending",
        progress.total,
        progress.completed,
        progress.failed,
        progress.pending + progress.processing
    );
}

/// Generate copy for the selected products.
///
/// Completed jobs from an earlier run are skipped. Ctrl-C stops the run
/// after the job in flight; running the same command again resumes it.
///
/// # Errors
///
/// Returns an error if nothing valid is selected, no API key is available,
/// or a result cannot be persisted.
pub(crate) async fn run_batch_run(
    config: &AppConfig,
    store: &LocalStore,
    source: &CatalogArgs,
    select: &[String],
) -> anyhow::Result<()> {
    let client = keyed_client(config, store).await?;
    let products = active_catalog(store, source).await?;
    let selected = select_products(&products, select)?;
    if selected.is_empty() {
        anyhow::bail!("nothing selected; pass --select ID,...");
    }

    let pipeline = open_pipeline(client, store, &selected)
        .await?
        .with_observer(report_transition);

    let token = pipeline.cancel_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("cancel requested; stopping after the current job");
            token.cancel();
        }
    });
    let outcome = pipeline.run_batch().await;
    ctrl_c.abort();
    let summary = outcome.map_err(with_key_hint)?;

    println!();
    print_jobs(&pipeline.snapshot());
    if summary.cancelled {
        println!("cancelled; run the same command again to resume");
    }
    Ok(())
}

/// Regenerate one product and persist the new result.
///
/// # Errors
///
/// Returns an error if the id is not in the catalog, no API key is
/// available, or the result cannot be persisted.
pub(crate) async fn run_batch_regenerate(
    config: &AppConfig,
    store: &LocalStore,
    source: &CatalogArgs,
    id: &str,
) -> anyhow::Result<()> {
    let id = id.trim();
    let client = keyed_client(config, store).await?;
    let products = active_catalog(store, source).await?;
    let selected = select_products(&products, &[id.to_owned()])?;

    let pipeline = open_pipeline(client, store, &selected)
        .await?
        .with_observer(report_transition);
    let result = pipeline.regenerate(id).await.map_err(with_key_hint)?;

    println!();
    print_jobs(std::slice::from_ref(&result));
    Ok(())
}

/// Show stored job states without generating anything.
///
/// Results stored for a different catalog are not shown; the next `run`
/// clears them.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the store fails.
pub(crate) async fn run_batch_status(
    store: &LocalStore,
    source: &CatalogArgs,
    select: &[String],
) -> anyhow::Result<()> {
    let catalog = load_catalog(source)?;
    let fingerprint = catalog.fingerprint();
    let products = if select.is_empty() {
        catalog.products
    } else {
        select_products(&catalog.products, select)?
    };

    let mut stored = if store.catalog_fingerprint().await?.as_deref() == Some(fingerprint.as_str()) {
        store.batch_results().await?
    } else {
        println!("no results stored for this catalog yet");
        HashMap::new()
    };

    let jobs: Vec<BatchResult> = products
        .iter()
        .map(|product| {
            stored
                .remove(&product.id)
                .map_or_else(|| BatchResult::pending(product), BatchResult::into_resumable)
        })
        .collect();
    print_jobs(&jobs);
    Ok(())
}

/// Print the stored copy for one product in one language.
///
/// # Errors
///
/// Returns an error if nothing is stored for `id` or the store fails.
pub(crate) async fn run_batch_show(
    store: &LocalStore,
    id: &str,
    lang: Language,
) -> anyhow::Result<()> {
    let job = store.batch_result(id).await?.ok_or_else(|| {
        anyhow::anyhow!("no stored result for '{id}'; run `tkpro batch run --select {id}` first")
    })?;

    println!("{} \u{2014} {}", job.product_id(), job.product_name());
    println!("status: {}", job.status());
    if let Some(error) = job.error_msg() {
        println!("error:  {error}");
    }

    let Some(content) = job.content(lang) else {
        return Ok(());
    };
    println!();
    println!("TITLE");
    println!("{}", content.title);
    println!();
    println!("DESCRIPTION");
    println!("{}", content.description);
    println!();
    println!("SCRIPT");
    println!("{}", content.script);
    Ok(())
}
