//! The boundary between tkpro and a text-generation provider.

use async_trait::async_trait;

use crate::error::GenerationError;

/// Callback receiving the accumulated text each time a streamed chunk lands.
pub type PartialSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A text-generation provider.
///
/// Implementations must report [`GenerationError::MissingCredential`] rather
/// than attempting a request when no key is configured, and callers are
/// expected to check [`GenerationClient::has_credential`] up front.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Whether a usable API key is configured.
    fn has_credential(&self) -> bool;

    /// Generates text, reporting each accumulated partial to `on_partial`
    /// before returning the final text.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] for credential, network or provider
    /// failures, and [`GenerationError::EmptyResponse`] when nothing was
    /// generated.
    async fn stream_text(
        &self,
        prompt: &str,
        temperature: f64,
        on_partial: Option<PartialSink<'_>>,
    ) -> Result<String, GenerationError>;

    /// Single-shot text generation with search grounding enabled.
    ///
    /// May return an empty string when the provider found nothing to say.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] for credential, network or provider
    /// failures.
    async fn search_text(&self, prompt: &str, temperature: f64) -> Result<String, GenerationError>;

    /// Final text only.
    ///
    /// # Errors
    ///
    /// See [`GenerationClient::stream_text`].
    async fn generate_text(&self, prompt: &str, temperature: f64) -> Result<String, GenerationError> {
        self.stream_text(prompt, temperature, None).await
    }

    /// Text expected to contain one JSON object, possibly wrapped in prose
    /// or code fences. Use [`crate::extract::extract_json_object`] on the
    /// result.
    ///
    /// # Errors
    ///
    /// See [`GenerationClient::stream_text`].
    async fn generate_structured(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<String, GenerationError> {
        self.generate_text(prompt, temperature).await
    }
}
