//! Evidence upload: folder hierarchy, post folder and every screenshot.

use postmetrics_core::{FolderPath, ImageAttachment};

use crate::drive::DriveClient;
use crate::error::GoogleError;

/// Stores `images` in a new post folder under `root_id / path` and returns
/// the post folder's web link.
///
/// Storage is best effort: any failure is logged and reported as `None` so
/// the caller can still record its result without a link.
pub async fn upload_evidence(
    drive: &DriveClient,
    root_id: &str,
    path: &FolderPath,
    post_folder_name: &str,
    images: &[ImageAttachment],
) -> Option<String> {
    match try_upload(drive, root_id, path, post_folder_name, images).await {
        Ok(link) => Some(link),
        Err(e) => {
            tracing::warn!(
                error = %e,
                %path,
                post_folder = post_folder_name,
                "evidence upload failed; continuing without link"
            );
            None
        }
    }
}

async fn try_upload(
    drive: &DriveClient,
    root_id: &str,
    path: &FolderPath,
    post_folder_name: &str,
    images: &[ImageAttachment],
) -> Result<String, GoogleError> {
    let parent_id = drive.resolve_path(root_id, path).await?;
    let post_folder = drive.create_folder(&parent_id, post_folder_name).await?;

    for image in images {
        let bytes = tokio::fs::read(&image.path)
            .await
            .map_err(|source| GoogleError::Io {
                path: image.path.clone(),
                source,
            })?;
        drive
            .upload_file(&post_folder.id, &image.stored_name, &image.mime_type, bytes)
            .await?;
    }

    tracing::info!(
        folder_id = %post_folder.id,
        files = images.len(),
        "evidence stored in Drive"
    );
    post_folder.web_view_link.ok_or(GoogleError::MissingField {
        context: "files.create(folder)".to_string(),
        field: "webViewLink",
    })
}
