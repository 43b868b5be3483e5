//! One form post: campaign metadata plus the screenshots to analyse.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Placeholder used in folder names when the form leaves `content_id` empty.
pub const DEFAULT_CONTENT_LABEL: &str = "General";

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid regex"));

/// An uploaded screenshot spooled to local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// File name as sent by the browser.
    pub original_name: String,
    /// Sanitized name used on disk and in Drive.
    pub stored_name: String,
    pub mime_type: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub client_name: String,
    pub campaign_name: String,
    pub influencer_name: String,
    pub platform: String,
    pub format: String,
    /// `None` when the form field was absent or blank.
    pub content_id: Option<String>,
    pub organic_paid: String,
    pub images: Vec<ImageAttachment>,
}

impl Submission {
    /// Drive folder levels under the root: client → campaign → influencer →
    /// platform → format.
    #[must_use]
    pub fn folder_path(&self) -> FolderPath {
        FolderPath::new(vec![
            self.client_name.clone(),
            self.campaign_name.clone(),
            self.influencer_name.clone(),
            self.platform.clone(),
            self.format.clone(),
        ])
    }

    /// `content_id` or [`DEFAULT_CONTENT_LABEL`].
    #[must_use]
    pub fn content_label(&self) -> &str {
        self.content_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_LABEL)
    }

    /// Name of the leaf post folder, e.g. `"General - 20250301_142501"`.
    #[must_use]
    pub fn post_folder_name(&self, at: NaiveDateTime) -> String {
        format!("{} - {}", self.content_label(), at.format("%Y%m%d_%H%M%S"))
    }
}

/// Ordered folder names from just below the storage root down to the leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderPath(Vec<String>);

impl FolderPath {
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FolderPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" / "))
    }
}

/// Reduces a browser-supplied file name to a safe ASCII name.
///
/// Path components are dropped and accented letters lose their marks
/// (`é` becomes `e`). Whitespace becomes `_`, anything outside
/// `[A-Za-z0-9_.-]` is removed, and leading dots are stripped. Returns
/// `None` when nothing usable is left.
#[must_use]
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let unaccented: String = base.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let joined = unaccented.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_start_matches('.').trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Best-effort image MIME type from a file extension.
///
/// Falls back to `image/png`, which is what the browser form produces for
/// pasted screenshots.
#[must_use]
pub fn guess_image_mime(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "image/png",
    }
}
