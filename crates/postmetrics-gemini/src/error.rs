use thiserror::Error;

/// Errors returned by the Gemini client.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// `extract_metrics` was called without any image; no request is sent.
    #[error("no images supplied for extraction")]
    NoImages,

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid Gemini base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The backend is at capacity (HTTP 503/429, `UNAVAILABLE`,
    /// `RESOURCE_EXHAUSTED`). Callers surface this distinctly.
    #[error("Gemini is overloaded (HTTP {status}): {message}")]
    Overloaded { status: u16, message: String },

    /// Any other non-2xx response.
    #[error("Gemini API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx response with no candidate text, e.g. a safety block.
    #[error("Gemini returned no content: {0}")]
    EmptyResponse(String),

    /// The envelope or the model's JSON answer could not be decoded.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GeminiError {
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        matches!(self, Self::Overloaded { .. })
    }
}
