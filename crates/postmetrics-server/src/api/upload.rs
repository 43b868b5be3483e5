//! `POST /upload`: multipart intake into the request spool, then the
//! processing pipeline.

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use postmetrics_core::{guess_image_mime, ImageAttachment, Submission};
use tokio::io::AsyncWriteExt;
use tracing::Instrument;

use super::AppState;
use crate::middleware::RequestId;
use crate::pipeline::{process_submission, SubmitError, SuccessBody};
use crate::spool::Spool;

/// Accepted names for the file input; browsers send the `[]` form.
const IMAGE_FIELDS: [&str; 2] = ["metric_images[]", "metric_images"];

pub(super) async fn upload(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let span = tracing::info_span!("upload", request_id = %req_id.0);
    handle_upload(state, multipart).instrument(span).await
}

async fn handle_upload(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut spool = match Spool::create(&state.config.spool_dir) {
        Ok(spool) => spool,
        Err(e) => return reject(SubmitError::Spool(e)),
    };

    let result = match read_submission(multipart, &mut spool).await {
        Ok(submission) => {
            tracing::info!(
                path = %submission.folder_path(),
                images = submission.images.len(),
                "submission received"
            );
            process_submission(&state.services, &submission).await
        }
        Err(e) => Err(e),
    };
    spool.close();

    match result {
        Ok(data) => (StatusCode::OK, Json(SuccessBody::new(data))).into_response(),
        Err(e) => reject(e),
    }
}

fn reject(error: SubmitError) -> Response {
    let status = error.status();
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = ?error, "submission failed");
    } else {
        tracing::warn!(status = status.as_u16(), %error, "submission rejected");
    }
    error.into_response()
}

/// Text fields of the form, collected in any order.
#[derive(Debug, Default)]
struct FormFields {
    client_name: Option<String>,
    campaign_name: Option<String>,
    influencer_name: Option<String>,
    platform: Option<String>,
    format: Option<String>,
    organic_paid: Option<String>,
    content_id: Option<String>,
}

impl FormFields {
    fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "client_name" => &mut self.client_name,
            "campaign_name" => &mut self.campaign_name,
            "influencer_name" => &mut self.influencer_name,
            "platform" => &mut self.platform,
            "format" => &mut self.format,
            "organic_paid" => &mut self.organic_paid,
            "content_id" => &mut self.content_id,
            _ => {
                tracing::debug!(field = name, "ignoring unknown form field");
                return;
            }
        };
        *slot = Some(value);
    }

    fn into_submission(self, images: Vec<ImageAttachment>) -> Result<Submission, SubmitError> {
        let submission = Submission {
            client_name: required(self.client_name, "client_name")?,
            campaign_name: required(self.campaign_name, "campaign_name")?,
            influencer_name: required(self.influencer_name, "influencer_name")?,
            platform: required(self.platform, "platform")?,
            format: required(self.format, "format")?,
            organic_paid: required(self.organic_paid, "organic_paid")?,
            content_id: self
                .content_id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            images,
        };
        if submission.images.is_empty() {
            return Err(SubmitError::NoFiles);
        }
        Ok(submission)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, SubmitError> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(SubmitError::MissingField(field))
}

async fn read_submission(
    multipart: Result<Multipart, MultipartRejection>,
    spool: &mut Spool,
) -> Result<Submission, SubmitError> {
    let mut multipart =
        multipart.map_err(|e| SubmitError::from_multipart(e.status(), e.body_text()))?;
    let mut fields = FormFields::default();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SubmitError::from_multipart(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if IMAGE_FIELDS.contains(&name.as_str()) {
            if let Some(image) = spool_image(field, spool).await? {
                images.push(image);
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| SubmitError::from_multipart(e.status(), e.body_text()))?;
            fields.set(&name, value);
        }
    }

    fields.into_submission(images)
}

/// Streams one file part to disk. Empty parts (a file input left blank)
/// yield `None`.
async fn spool_image(
    mut field: Field<'_>,
    spool: &mut Spool,
) -> Result<Option<ImageAttachment>, SubmitError> {
    let original_name = field.file_name().unwrap_or_default().to_owned();
    let mime_type = field
        .content_type()
        .filter(|ct| ct.starts_with("image/"))
        .map_or_else(|| guess_image_mime(&original_name).to_owned(), ToOwned::to_owned);
    let (stored_name, path) = spool.reserve(&original_name);

    let mut file = tokio::fs::File::create(&path).await?;
    let mut written = 0usize;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| SubmitError::from_multipart(e.status(), e.body_text()))?
    {
        written += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    if written == 0 {
        tokio::fs::remove_file(&path).await?;
        return Ok(None);
    }

    tracing::debug!(name = %stored_name, bytes = written, mime = %mime_type, "image spooled");
    Ok(Some(ImageAttachment {
        original_name,
        stored_name,
        mime_type,
        path,
    }))
}
