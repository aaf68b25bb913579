use thiserror::Error;

/// Errors returned by a generation client.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key is configured for the active role.
    #[error("missing API key")]
    MissingCredential,

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("generation API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider finished without producing any text.
    #[error("generation returned no text")]
    EmptyResponse,

    /// The response contained no JSON object.
    #[error("no JSON object found in generated text")]
    NoJsonObject,

    /// A JSON payload did not match the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Errors that abort a batch operation as a whole.
///
/// Per-job generation failures never show up here; they are recorded on the
/// job itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing API key; set one before generating")]
    MissingCredential,

    #[error("product {0} is not part of this batch")]
    UnknownProduct(String),

    #[error("product {0} is already being generated")]
    AlreadyInFlight(String),

    #[error("failed to persist batch result: {0}")]
    Persist(#[source] Box<dyn std::error::Error + Send + Sync>),
}
