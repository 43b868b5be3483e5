use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoogleError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service-account key could not be parsed or a token not minted.
    #[error("Google auth error: {0}")]
    Auth(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Non-2xx response; `message` is Google's error message when present.
    #[error("{service} API error (HTTP {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx response without a field the caller depends on.
    #[error("{context}: response is missing '{field}'")]
    MissingField {
        context: String,
        field: &'static str,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
