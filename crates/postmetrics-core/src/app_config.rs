use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings, loaded once at startup and handed to each client
/// at construction.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub drive_root_folder_id: String,
    pub drive_base_url: String,
    pub sheet_id: String,
    pub worksheet_name: String,
    pub sheets_base_url: String,
    /// Raw service-account key JSON (`GOOGLE_CREDENTIALS_JSON`).
    pub google_credentials_json: String,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub spool_dir: PathBuf,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("gemini_api_key", &"[redacted]")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("drive_root_folder_id", &self.drive_root_folder_id)
            .field("drive_base_url", &self.drive_base_url)
            .field("sheet_id", &self.sheet_id)
            .field("worksheet_name", &self.worksheet_name)
            .field("sheets_base_url", &self.sheets_base_url)
            .field("google_credentials_json", &"[redacted]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("spool_dir", &self.spool_dir)
            .finish()
    }
}
