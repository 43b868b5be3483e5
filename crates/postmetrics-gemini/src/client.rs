//! HTTP client for the Gemini REST API.
//!
//! Wraps `reqwest` with Gemini-specific error classification. Capacity
//! errors are reported as [`GeminiError::Overloaded`] so the caller can
//! answer with a dedicated message; everything else is a plain failure.
//! Each call is attempted exactly once.

use std::time::Duration;

use base64::Engine as _;
use postmetrics_core::ConsolidatedMetrics;
use reqwest::{Client, StatusCode, Url};

use crate::error::GeminiError;
use crate::prompt::extraction_prompt;
use crate::types::{
    Blob, Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, Part,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// One screenshot to send as inline data.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Client for `models/{model}:generateContent`.
///
/// Use [`GeminiClient::new`] for production or [`GeminiClient::with_base_url`]
/// to point at a mock server in tests.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl GeminiClient {
    /// Creates a new client pointed at the production Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, GeminiError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`GeminiError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("postmetrics/0.1 (metric-extraction)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeminiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends every image with the extraction prompt and returns the
    /// consolidated metrics.
    ///
    /// # Errors
    ///
    /// - [`GeminiError::NoImages`] if `images` is empty (nothing is sent).
    /// - [`GeminiError::Overloaded`] on a capacity response.
    /// - [`GeminiError::Api`] on any other non-2xx response.
    /// - [`GeminiError::EmptyResponse`] if the model returned no text.
    /// - [`GeminiError::Deserialize`] if the answer is not a JSON object of
    ///   metrics.
    /// - [`GeminiError::Http`] on network failure or timeout.
    pub async fn extract_metrics(
        &self,
        images: &[InlineImage],
    ) -> Result<ConsolidatedMetrics, GeminiError> {
        if images.is_empty() {
            return Err(GeminiError::NoImages);
        }

        let prompt = extraction_prompt(images.len());
        let text = self.generate_json_text(&prompt, images).await?;
        let json = strip_code_fence(&text);

        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| GeminiError::Deserialize {
                context: "model answer".to_string(),
                source: e,
            })?;
        let metrics =
            ConsolidatedMetrics::from_model_value(value).map_err(|e| GeminiError::Deserialize {
                context: "model answer".to_string(),
                source: e,
            })?;

        tracing::info!(
            model = %self.model,
            images = images.len(),
            any_metric = metrics.has_any_metric(),
            "metrics extracted"
        );
        Ok(metrics)
    }

    /// Runs one `generateContent` call with JSON output mode and returns the
    /// first candidate's text.
    async fn generate_json_text(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> Result<String, GeminiError> {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::Text { text: prompt });
        parts.extend(images.iter().map(|img| Part::InlineData {
            inline_data: Blob {
                mime_type: &img.mime_type,
                data: base64::engine::general_purpose::STANDARD.encode(&img.data),
            },
        }));

        let request = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        };

        let url = self.endpoint()?;
        tracing::debug!(model = %self.model, images = images.len(), "calling generateContent");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let envelope: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| GeminiError::Deserialize {
                context: format!("generateContent({})", self.model),
                source: e,
            })?;

        envelope
            .first_text()
            .ok_or_else(|| GeminiError::EmptyResponse(envelope.empty_reason()))
    }

    fn endpoint(&self) -> Result<Url, GeminiError> {
        let method = format!("{}:generateContent", self.model);
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GeminiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(["v1beta", "models", method.as_str()]);
        Ok(url)
    }
}

/// Maps a non-2xx response onto [`GeminiError::Overloaded`] or
/// [`GeminiError::Api`].
fn classify_error(status: StatusCode, body: &str) -> GeminiError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let api_status = detail.as_ref().and_then(|d| d.status.as_deref());
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(300).collect());

    let overloaded = matches!(
        status,
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS
    ) || matches!(api_status, Some("UNAVAILABLE" | "RESOURCE_EXHAUSTED"));

    if overloaded {
        tracing::warn!(status = status.as_u16(), %message, "Gemini reported overload");
        GeminiError::Overloaded {
            status: status.as_u16(),
            message,
        }
    } else {
        tracing::error!(status = status.as_u16(), %message, "Gemini request failed");
        GeminiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````).
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
