//! Content generation for tkpro.
//!
//! Defines the [`GenerationClient`] boundary and its Gemini implementation,
//! the prompts and parsing for bilingual listing copy, the sequential
//! [`BatchPipeline`], and the headline lookup used by the news ticker.

pub mod client;
pub mod content;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod news;
pub mod pipeline;
pub mod prompt;
pub mod store;

pub use client::{GenerationClient, PartialSink};
pub use content::{parse_bilingual, BilingualContent};
pub use error::{GenerationError, PipelineError};
pub use extract::{extract_json_object, strip_code_fences};
pub use gemini::GeminiClient;
pub use news::{latest_headline, HEADLINE_UNAVAILABLE, NO_HEADLINE};
pub use pipeline::{
    BatchPipeline, BatchRunSummary, CancelToken, ProgressObserver, GENERATION_FAILED_MESSAGE,
};
pub use store::{MemoryResultStore, ResultStore, StoreFailure};
