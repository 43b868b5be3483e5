//! Plumbing shared by the Drive and Sheets clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::GoogleError;

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, GoogleError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent("postmetrics/0.1 (evidence-storage)")
        .build()?)
}

/// Parses `base_url`, normalising it to end with exactly one `/`.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, GoogleError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    let url = Url::parse(&normalised).map_err(|e| GoogleError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(GoogleError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: "cannot be a base URL".to_string(),
        });
    }
    Ok(url)
}

/// `base` with `segments` appended as percent-encoded path segments.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, GoogleError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| GoogleError::InvalidBaseUrl {
            url: base.to_string(),
            reason: "cannot be a base URL".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Sends `request` and decodes a 2xx JSON body into `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    context: &str,
    request: RequestBuilder,
) -> Result<T, GoogleError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.chars().take(300).collect());
        return Err(GoogleError::Api {
            service,
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| GoogleError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}
