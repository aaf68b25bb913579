//! Batch content-generation results.
//!
//! A [`BatchResult`] is a whole-record snapshot of one job. Transitions
//! consume the old record and return a new one, so a reader holding a
//! snapshot never observes a half-updated job.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::products::Product;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    /// `true` for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Output language of a [`GeneratedContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "zh" | "chinese" | "cn" => Ok(Language::Zh),
            other => Err(CoreError::InvalidLanguage(other.to_owned())),
        }
    }
}

/// Listing copy for one product in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub description: String,
    pub script: String,
}

/// State of one product's content-generation job.
///
/// Holds `status == Completed` exactly when both language variants are
/// present, and an error message only when `status == Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    product_id: String,
    product_name: String,
    status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_en: Option<GeneratedContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_zh: Option<GeneratedContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_msg: Option<String>,
}

impl BatchResult {
    /// A fresh job for `product`, snapshotting its title.
    #[must_use]
    pub fn pending(product: &Product) -> Self {
        Self::pending_for(&product.id, &product.title)
    }

    #[must_use]
    pub fn pending_for(product_id: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            status: BatchStatus::Pending,
            content_en: None,
            content_zh: None,
            error_msg: None,
        }
    }

    /// Marks the job in flight, dropping any previous content or error.
    #[must_use]
    pub fn into_processing(self) -> Self {
        Self {
            status: BatchStatus::Processing,
            content_en: None,
            content_zh: None,
            error_msg: None,
            ..self
        }
    }

    #[must_use]
    pub fn into_completed(self, content_en: GeneratedContent, content_zh: GeneratedContent) -> Self {
        Self {
            status: BatchStatus::Completed,
            content_en: Some(content_en),
            content_zh: Some(content_zh),
            error_msg: None,
            ..self
        }
    }

    /// Marks the job failed. Content is dropped: a failed job never carries
    /// partial or stale copy.
    #[must_use]
    pub fn into_failed(self, error_msg: impl Into<String>) -> Self {
        Self {
            status: BatchStatus::Failed,
            content_en: None,
            content_zh: None,
            error_msg: Some(error_msg.into()),
            ..self
        }
    }

    /// Normalizes a record loaded from storage.
    ///
    /// A persisted `Processing` record means the previous session stopped
    /// mid-call, and a `Completed` record missing either language is not
    /// usable; both go back to `Pending` so the next run picks them up.
    #[must_use]
    pub fn into_resumable(self) -> Self {
        let usable = match self.status {
            BatchStatus::Processing => false,
            BatchStatus::Completed => self.content_en.is_some() && self.content_zh.is_some(),
            BatchStatus::Pending | BatchStatus::Failed => true,
        };
        if usable {
            self
        } else {
            Self::pending_for(self.product_id, self.product_name)
        }
    }

    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    #[must_use]
    pub fn status(&self) -> BatchStatus {
        self.status
    }

    #[must_use]
    pub fn content_en(&self) -> Option<&GeneratedContent> {
        self.content_en.as_ref()
    }

    #[must_use]
    pub fn content_zh(&self) -> Option<&GeneratedContent> {
        self.content_zh.as_ref()
    }

    #[must_use]
    pub fn content(&self, language: Language) -> Option<&GeneratedContent> {
        match language {
            Language::En => self.content_en(),
            Language::Zh => self.content_zh(),
        }
    }

    #[must_use]
    pub fn error_msg(&self) -> Option<&str> {
        self.error_msg.as_deref()
    }
}

/// Per-status job counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchProgress {
    #[must_use]
    pub fn tally<'a>(results: impl IntoIterator<Item = &'a BatchResult>) -> Self {
        let mut progress = Self::default();
        for result in results {
            progress.total += 1;
            match result.status() {
                BatchStatus::Pending => progress.pending += 1,
                BatchStatus::Processing => progress.processing += 1,
                BatchStatus::Completed => progress.completed += 1,
                BatchStatus::Failed => progress.failed += 1,
            }
        }
        progress
    }
}
