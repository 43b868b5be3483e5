//! Submission processing: extract, store evidence, append the row.
//!
//! Stages run strictly in order inside the request task. Evidence storage is
//! best effort; every other stage failure ends the request.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use postmetrics_core::{build_row, AppConfig, ConsolidatedMetrics, Submission};
use postmetrics_gemini::{GeminiClient, GeminiError, InlineImage};
use postmetrics_google::{
    upload_evidence, DriveClient, GoogleError, ServiceAccountTokens, SheetsClient, TokenSource,
};
use serde::Serialize;
use thiserror::Error;

pub const SUCCESS_MESSAGE: &str = "Lote procesado y guardado con éxito.";

/// Backend clients shared by every request.
pub struct Services {
    pub extractor: GeminiClient,
    pub drive: DriveClient,
    pub sheets: SheetsClient,
    pub drive_root_folder_id: String,
}

impl Services {
    /// Builds every client from configuration, authenticating Google calls
    /// with the configured service-account key.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let tokens = ServiceAccountTokens::from_json(&config.google_credentials_json)?;
        Self::with_tokens(config, Arc::new(tokens))
    }

    pub fn with_tokens(config: &AppConfig, tokens: Arc<dyn TokenSource>) -> anyhow::Result<Self> {
        let timeout = config.request_timeout_secs;
        Ok(Self {
            extractor: GeminiClient::with_base_url(
                &config.gemini_api_key,
                &config.gemini_model,
                timeout,
                &config.gemini_base_url,
            )?,
            drive: DriveClient::with_base_url(Arc::clone(&tokens), timeout, &config.drive_base_url)?,
            sheets: SheetsClient::with_base_url(
                tokens,
                &config.sheet_id,
                &config.worksheet_name,
                timeout,
                &config.sheets_base_url,
            )?,
            drive_root_folder_id: config.drive_root_folder_id.clone(),
        })
    }
}

/// Why a submission was rejected; each variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Falta el campo obligatorio: {0}.")]
    MissingField(&'static str),

    #[error("Solicitud inválida: {0}")]
    Malformed(String),

    #[error("No se recibieron archivos.")]
    NoFiles,

    #[error("Los archivos superan el tamaño máximo permitido.")]
    TooLarge,

    #[error("El servicio de IA está sobrecargado. Por favor, inténtalo de nuevo en unos minutos.")]
    Overloaded(#[source] GeminiError),

    #[error("{0}")]
    Extraction(#[source] GeminiError),

    #[error("{0}")]
    Persist(#[source] GoogleError),

    #[error("error al guardar los archivos temporales: {0}")]
    Spool(#[from] std::io::Error),
}

impl SubmitError {
    /// Classifies a multipart failure by the status the extractor reports.
    #[must_use]
    pub fn from_multipart(status: StatusCode, detail: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Malformed(detail)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::Malformed(_) | Self::NoFiles => StatusCode::BAD_REQUEST,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Extraction(_) | Self::Persist(_) | Self::Spool(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<GeminiError> for SubmitError {
    fn from(e: GeminiError) -> Self {
        if e.is_overloaded() {
            Self::Overloaded(e)
        } else {
            Self::Extraction(e)
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessedData {
    pub metrics: ConsolidatedMetrics,
    pub drive_folder_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub status: &'static str,
    pub message: &'static str,
    pub processed_data: ProcessedData,
}

impl SuccessBody {
    pub fn new(processed_data: ProcessedData) -> Self {
        Self {
            status: "success",
            message: SUCCESS_MESSAGE,
            processed_data,
        }
    }
}

/// Runs one validated submission through every stage.
pub async fn process_submission(
    services: &Services,
    submission: &Submission,
) -> Result<ProcessedData, SubmitError> {
    if submission.images.is_empty() {
        return Err(SubmitError::NoFiles);
    }

    let mut images = Vec::with_capacity(submission.images.len());
    for image in &submission.images {
        images.push(InlineImage {
            mime_type: image.mime_type.clone(),
            data: tokio::fs::read(&image.path).await?,
        });
    }

    let metrics = services.extractor.extract_metrics(&images).await?;
    drop(images);

    let now = Local::now().naive_local();
    let post_folder = submission.post_folder_name(now);
    let link = upload_evidence(
        &services.drive,
        &services.drive_root_folder_id,
        &submission.folder_path(),
        &post_folder,
        &submission.images,
    )
    .await;

    let row = build_row(submission, &metrics, link.as_deref(), now);
    services
        .sheets
        .append_row(&row)
        .await
        .map_err(SubmitError::Persist)?;

    tracing::info!(
        client = %submission.client_name,
        campaign = %submission.campaign_name,
        images = submission.images.len(),
        evidence = link.is_some(),
        "submission stored"
    );
    Ok(ProcessedData {
        metrics,
        drive_folder_link: link,
    })
}
