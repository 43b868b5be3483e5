use crate::app_config::{
    AppConfig, Environment, DEFAULT_DRIVE_BASE_URL, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_SHEETS_BASE_URL,
};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    // Blank values count as missing: an empty API key is never useful.
    let require = |var: &str| -> Result<String, ConfigError> {
        match lookup(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ConfigError::MissingEnvVar(var.to_string())),
        }
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let gemini_api_key = require("GEMINI_API_KEY")?;
    let drive_root_folder_id = require("DRIVE_ROOT_FOLDER_ID")?;
    let sheet_id = require("SHEET_ID")?;
    let google_credentials_json = require("GOOGLE_CREDENTIALS_JSON")?;

    let env = parse_environment(&or_default("POSTMETRICS_ENV", "development"))?;
    let bind_addr = parse_addr("POSTMETRICS_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("POSTMETRICS_LOG_LEVEL", "info");

    let gemini_model = or_default("GEMINI_MODEL", "gemini-1.5-flash-latest");
    let gemini_base_url = or_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL);
    let drive_base_url = or_default("GOOGLE_DRIVE_BASE_URL", DEFAULT_DRIVE_BASE_URL);
    let sheets_base_url = or_default("GOOGLE_SHEETS_BASE_URL", DEFAULT_SHEETS_BASE_URL);
    let worksheet_name = or_default("WORKSHEET_NAME", "Master_Data");

    let request_timeout_secs = parse_u64("POSTMETRICS_REQUEST_TIMEOUT_SECS", "120")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "POSTMETRICS_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let max_upload_bytes = parse_usize("POSTMETRICS_MAX_UPLOAD_BYTES", "33554432")?;
    let spool_dir =
        lookup("POSTMETRICS_SPOOL_DIR").map_or_else(|_| std::env::temp_dir(), PathBuf::from);

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        gemini_api_key,
        gemini_model,
        gemini_base_url,
        drive_root_folder_id,
        drive_base_url,
        sheet_id,
        worksheet_name,
        sheets_base_url,
        google_credentials_json,
        request_timeout_secs,
        max_upload_bytes,
        spool_dir,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "POSTMETRICS_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
