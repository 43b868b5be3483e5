//! Shared configuration and domain types for the postmetrics workspace.
//!
//! Everything here is pure: no network, no filesystem beyond `.env` loading.

pub mod app_config;
pub mod config;
pub mod metrics;
pub mod row;
pub mod submission;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use metrics::{parse_metric_value, ConsolidatedMetrics, MetricParseError, NO_METRICS_NOTE};
pub use row::{build_row, OutputRow, ROW_COLUMNS};
pub use submission::{
    guess_image_mime, sanitize_filename, FolderPath, ImageAttachment, Submission,
    DEFAULT_CONTENT_LABEL,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
