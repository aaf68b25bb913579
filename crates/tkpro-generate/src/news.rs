//! Latest-headline lookup for the dashboard news ticker.

use crate::client::GenerationClient;
use crate::error::GenerationError;
use crate::prompt::{headline_prompt, HEADLINE_TEMPERATURE};

/// Shown when the provider answered with nothing.
pub const NO_HEADLINE: &str = "暂无最新动态";

/// Shown when the lookup failed for any reason other than a missing key.
pub const HEADLINE_UNAVAILABLE: &str = "获取失败 (请检查网络/Key)";

/// Fetches the most recent headline from `site` about `topic`.
///
/// This path is read-only and low stakes, so provider and network failures
/// come back as [`HEADLINE_UNAVAILABLE`] instead of an error.
///
/// # Errors
///
/// Returns [`GenerationError::MissingCredential`] when no API key is
/// configured.
pub async fn latest_headline(
    client: &dyn GenerationClient,
    site: &str,
    topic: &str,
) -> Result<String, GenerationError> {
    if !client.has_credential() {
        return Err(GenerationError::MissingCredential);
    }

    let prompt = headline_prompt(site, topic);
    match client.search_text(&prompt, HEADLINE_TEMPERATURE).await {
        Ok(text) => {
            let headline = text.trim();
            if headline.is_empty() {
                Ok(NO_HEADLINE.to_owned())
            } else {
                Ok(headline.to_owned())
            }
        }
        Err(GenerationError::MissingCredential) => Err(GenerationError::MissingCredential),
        Err(e) => {
            tracing::warn!(site, topic, error = %e, "headline lookup failed");
            Ok(HEADLINE_UNAVAILABLE.to_owned())
        }
    }
}
