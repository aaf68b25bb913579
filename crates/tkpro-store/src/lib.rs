//! Client-resident persistence for tkpro, backed by SQLite.
//!
//! Session values (role, API key, avatar, catalog fingerprint) live in a
//! key→value table; batch results live one row per product id. Every value
//! is read and written independently, and absent values read as defaults.

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

pub mod kv;
pub mod results;
pub mod session;

pub use results::BatchResultRow;
pub use session::SessionState;

const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/tkpro-store/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("stored value for {key} is not valid JSON: {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Handle to the local store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Opens (creating if needed) the database at `database_url` and applies
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the database cannot be opened and
    /// [`StoreError::Migration`] if a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = database_url
            .parse::<SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// See [`LocalStore::connect`].
    pub async fn in_memory() -> Result<Self, StoreError> {
        // Each in-memory connection is its own database, so pin the pool to one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if a migration fails.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let applied = run_migrations(&pool).await?;
        if applied > 0 {
            tracing::info!(applied, "applied local store migrations");
        }
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist yet on a fresh database.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}
