//! Google Drive v3 client: folder lookup/creation and file upload.
//!
//! Folder creation is idempotent per `(parent, name)` within one process:
//! concurrent callers resolving the same pair are serialised, so the second
//! one finds the folder the first one created. Separate processes can still
//! race and produce duplicate siblings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use postmetrics_core::FolderPath;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::auth::TokenSource;
use crate::error::GoogleError;
use crate::http::{build_client, join_segments, parse_base_url, send_json};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const SERVICE: &str = "Drive";

type FolderKey = (String, String);

/// Escapes a value for use inside a single-quoted Drive query literal.
#[must_use]
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A newly created folder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFolder {
    pub id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewFile<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    parents: [&'a str; 1],
}

pub struct DriveClient {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    base_url: Url,
    folder_locks: Mutex<HashMap<FolderKey, Arc<AsyncMutex<()>>>>,
}

impl DriveClient {
    /// Creates a client pointed at `https://www.googleapis.com/`.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(tokens: Arc<dyn TokenSource>, timeout_secs: u64) -> Result<Self, GoogleError> {
        Self::with_base_url(tokens, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (a mock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`GoogleError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        tokens: Arc<dyn TokenSource>,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GoogleError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            tokens,
            base_url: parse_base_url(base_url)?,
            folder_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Looks up a non-trashed folder named `name` directly under `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] on auth, network or API failure.
    pub async fn find_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<Option<String>, GoogleError> {
        let query = format!(
            "mimeType = '{FOLDER_MIME_TYPE}' and name = '{}' and '{}' in parents and trashed = false",
            escape_query_literal(name),
            escape_query_literal(parent_id),
        );
        let url = join_segments(&self.base_url, &["drive", "v3", "files"])?;
        let token = self.tokens.access_token().await?;

        let request = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("pageSize", "1"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
        let list: FileList = send_json(SERVICE, "files.list", request).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    /// Creates a folder under `parent_id` without checking for an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] on auth, network or API failure.
    pub async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<CreatedFolder, GoogleError> {
        let url = join_segments(&self.base_url, &["drive", "v3", "files"])?;
        let token = self.tokens.access_token().await?;
        let body = NewFile {
            name,
            mime_type: Some(FOLDER_MIME_TYPE),
            parents: [parent_id],
        };

        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .query(&[("fields", "id,webViewLink"), ("supportsAllDrives", "true")])
            .json(&body);
        let folder: CreatedFolder = send_json(SERVICE, "files.create(folder)", request).await?;
        tracing::info!(parent_id, name, folder_id = %folder.id, "created Drive folder");
        Ok(folder)
    }

    /// Returns the id of folder `name` under `parent_id`, creating it when
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] if the lookup or the creation fails.
    pub async fn resolve_or_create(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<String, GoogleError> {
        let key = (parent_id.to_owned(), name.to_owned());
        let lock = self.folder_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            match self.find_folder(parent_id, name).await {
                Ok(Some(id)) => Ok(id),
                Ok(None) => self.create_folder(parent_id, name).await.map(|f| f.id),
                Err(e) => Err(e),
            }
        };
        drop(lock);
        self.release_folder_lock(&key);
        result
    }

    /// Walks `path` below `root_id`, resolving or creating each level, and
    /// returns the id of the deepest folder.
    ///
    /// # Errors
    ///
    /// Returns the first [`GoogleError`] encountered; levels resolved before
    /// the failure are left in place.
    pub async fn resolve_path(&self, root_id: &str, path: &FolderPath) -> Result<String, GoogleError> {
        let mut current = root_id.to_owned();
        for segment in path.segments() {
            current = self.resolve_or_create(&current, segment).await?;
        }
        tracing::debug!(%path, folder_id = %current, "resolved Drive folder path");
        Ok(current)
    }

    /// Uploads `bytes` as a new file in `parent_id` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] on auth, network or API failure.
    pub async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, GoogleError> {
        let url = join_segments(&self.base_url, &["upload", "drive", "v3", "files"])?;
        let token = self.tokens.access_token().await?;
        let metadata = serde_json::to_vec(&NewFile {
            name,
            mime_type: None,
            parents: [parent_id],
        })
        .map_err(|e| GoogleError::Deserialize {
            context: "file metadata".to_string(),
            source: e,
        })?;

        let boundary = format!("postmetrics-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, mime_type, &bytes);

        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id"),
                ("supportsAllDrives", "true"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        let file: FileRef = send_json(SERVICE, "files.create(upload)", request).await?;
        tracing::debug!(parent_id, name, file_id = %file.id, "uploaded file to Drive");
        Ok(file.id)
    }

    fn folder_lock(&self, key: &FolderKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .folder_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Drops the map entry once no caller holds or waits on it.
    fn release_folder_lock(&self, key: &FolderKey) {
        let mut locks = self
            .folder_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }
}

/// Builds a `multipart/related` body: JSON metadata part, then the media part.
fn multipart_related(boundary: &str, metadata: &[u8], mime_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + media.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
