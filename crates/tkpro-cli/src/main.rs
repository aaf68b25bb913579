mod batch;
mod catalog;
mod rank;
mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::batch::{run_batch_command, BatchCommands};
use crate::catalog::{run_inspect, CatalogArgs};
use crate::rank::{run_rank, RankBounds};
use crate::session::{generation_client, run_session, SessionCommands, MISSING_KEY_HINT};

#[derive(Debug, Parser)]
#[command(name = "tkpro")]
#[command(about = "Rank TikTok Shop exports and generate bilingual listing copy")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show an export's columns and the inferred field mapping
    Inspect {
        /// CSV or spreadsheet export
        file: PathBuf,
    },
    /// Rank the catalog by GMV with marketability grades
    Rank {
        #[command(flatten)]
        source: CatalogArgs,
        /// Lowest unit price in the cohort (defaults to the catalog's lowest)
        #[arg(long)]
        min_price: Option<f64>,
        /// Highest unit price in the cohort (defaults to the catalog's highest)
        #[arg(long)]
        max_price: Option<f64>,
        /// Minimum units sold (defaults to `TKPRO_MIN_SALES`)
        #[arg(long)]
        min_sales: Option<f64>,
        /// Maximum number of products to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Batch listing-copy generation
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
    /// Role, API key and avatar
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Fetch the latest headline a site published on a topic
    News {
        /// Site to search, e.g. 36Kr
        site: String,
        /// Topic to search for
        topic: String,
    },
}

/// Shortens `title` to `max` characters, marking the cut with `...`.
pub(crate) fn fmt_title(title: &str, max: usize) -> String {
    if title.chars().count() > max {
        format!("{}...", title.chars().take(max).collect::<String>())
    } else {
        title.to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = tkpro_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("tkpro ready; run `tkpro --help` to list commands");
        return Ok(());
    };

    match command {
        Commands::Inspect { file } => run_inspect(&file)?,
        Commands::Rank {
            source,
            min_price,
            max_price,
            min_sales,
            limit,
        } => {
            let bounds = RankBounds {
                min_price,
                max_price,
                min_sales,
            };
            run_rank(&config, &source, bounds, limit)?;
        }
        Commands::Batch { command } => {
            let store = tkpro_store::LocalStore::connect(&config.database_url).await?;
            run_batch_command(&config, &store, command).await?;
        }
        Commands::Session { command } => {
            let store = tkpro_store::LocalStore::connect(&config.database_url).await?;
            run_session(&config, &store, command).await?;
        }
        Commands::News { site, topic } => {
            let store = tkpro_store::LocalStore::connect(&config.database_url).await?;
            let client = generation_client(&config, &store).await?;
            let headline = tkpro_generate::latest_headline(&client, &site, &topic)
                .await
                .map_err(|e| match e {
                    tkpro_generate::GenerationError::MissingCredential => {
                        anyhow::anyhow!("{e}; {MISSING_KEY_HINT}")
                    }
                    other => other.into(),
                })?;
            println!("{site} \u{b7} {topic}: {headline}");
        }
    }

    Ok(())
}
