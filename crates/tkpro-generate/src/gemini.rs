//! HTTP client for the Gemini `generateContent` API.
//!
//! Streaming calls use the server-sent-event endpoint
//! (`:streamGenerateContent?alt=sse`) and read the body chunk by chunk, so
//! partial text is reported as it arrives. Headline lookups use the unary
//! endpoint with the search tool enabled.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::client::{GenerationClient, PartialSink};
use crate::error::GenerationError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const API_KEY_HEADER: &str = "x-goog-api-key";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, temperature: f64) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
            tools: Vec::new(),
        }
    }

    fn with_search(mut self) -> Self {
        self.tools.push(Tool {
            google_search: GoogleSearch {},
        });
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the Gemini REST API.
///
/// Use [`GeminiClient::new`] for production or [`GeminiClient::with_base_url`]
/// to point at a mock server in tests. Only a connect timeout is applied;
/// generation requests run until the provider finishes.
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    model: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client pointed at the production API.
    ///
    /// A blank `api_key` is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: Option<&str>,
        model: &str,
        connect_timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        Self::with_base_url(api_key, model, connect_timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GenerationError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<&str>,
        model: &str,
        connect_timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .user_agent("tkpro/0.1 (listing-copy)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GenerationError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned),
            base_url,
            model: model.to_owned(),
        })
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredential)
    }

    fn endpoint(&self, method: &str) -> Result<Url, GenerationError> {
        let path = format!("v1beta/models/{}:{method}", self.model);
        self.base_url
            .join(&path)
            .map_err(|e| GenerationError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn post(&self, url: Url, body: &GenerateRequest<'_>) -> Result<Response, GenerationError> {
        let key = self.api_key()?;
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, key)
            .json(body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Passes 2xx responses through and turns anything else into
    /// [`GenerationError::Api`] with the provider's message when it sent one.
    async fn check_status(response: Response) -> Result<Response, GenerationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_owned()
            });
        Err(GenerationError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Accumulates text from a server-sent-event body fed in arbitrary chunks.
#[derive(Debug, Default)]
struct SseAccumulator {
    pending: Vec<u8>,
    text: String,
}

impl SseAccumulator {
    /// Consumes every complete line in `chunk`, reporting the accumulated
    /// text to `on_partial` after each event that added some.
    fn push(
        &mut self,
        chunk: &[u8],
        on_partial: Option<PartialSink<'_>>,
    ) -> Result<(), GenerationError> {
        self.pending.extend_from_slice(chunk);
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.consume_line(&line, on_partial)?;
        }
        Ok(())
    }

    /// Consumes a final unterminated line, if any.
    fn finish(&mut self, on_partial: Option<PartialSink<'_>>) -> Result<(), GenerationError> {
        let rest = std::mem::take(&mut self.pending);
        self.consume_line(&rest, on_partial)
    }

    fn consume_line(
        &mut self,
        line: &[u8],
        on_partial: Option<PartialSink<'_>>,
    ) -> Result<(), GenerationError> {
        let line = String::from_utf8_lossy(line);
        let Some(data) = line.trim_end().strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(());
        }
        let event: GenerateResponse =
            serde_json::from_str(data).map_err(|source| GenerationError::Deserialize {
                context: "streamGenerateContent event".to_owned(),
                source,
            })?;
        let piece = event.text();
        if piece.is_empty() {
            return Ok(());
        }
        self.text.push_str(&piece);
        if let Some(sink) = on_partial {
            sink(&self.text);
        }
        Ok(())
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn stream_text(
        &self,
        prompt: &str,
        temperature: f64,
        on_partial: Option<PartialSink<'_>>,
    ) -> Result<String, GenerationError> {
        let mut url = self.endpoint("streamGenerateContent")?;
        url.query_pairs_mut().append_pair("alt", "sse");

        let request = GenerateRequest::new(prompt, temperature);
        let mut response = self.post(url, &request).await?;

        let mut sse = SseAccumulator::default();
        while let Some(chunk) = response.chunk().await? {
            sse.push(&chunk, on_partial)?;
        }
        sse.finish(on_partial)?;

        tracing::debug!(model = %self.model, chars = sse.text.len(), "generation stream finished");
        if sse.text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(sse.text)
    }

    async fn search_text(&self, prompt: &str, temperature: f64) -> Result<String, GenerationError> {
        let url = self.endpoint("generateContent")?;
        let request = GenerateRequest::new(prompt, temperature).with_search();
        let response = self.post(url, &request).await?;

        let body = response.text().await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|source| GenerationError::Deserialize {
                context: "generateContent".to_owned(),
                source,
            })?;
        Ok(parsed.text())
    }
}
