//! Core domain types for tkpro: products, cohorts, marketability scoring,
//! batch-generation results and application configuration.

pub mod app_config;
pub mod batch;
pub mod cohort;
pub mod config;
pub mod products;
pub mod scoring;

pub use app_config::{AppConfig, Environment, Role};
pub use batch::{BatchProgress, BatchResult, BatchStatus, GeneratedContent, Language};
pub use cohort::{Cohort, CohortFilter, RankedProduct};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{demo_catalog, CellValue, PriceRange, Product, RawRecord};
pub use scoring::{composite_score, score, AnalysisScore, ScoreGrade};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid language: {0}")]
    InvalidLanguage(String),
}
