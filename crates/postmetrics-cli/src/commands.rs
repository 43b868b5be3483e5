//! Handlers for each CLI subcommand. Output goes to stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use postmetrics_core::{guess_image_mime, AppConfig, FolderPath};
use postmetrics_gemini::{GeminiClient, InlineImage};
use postmetrics_google::{DriveClient, ServiceAccountTokens};

pub(crate) async fn run_extract(config: &AppConfig, paths: &[PathBuf]) -> anyhow::Result<()> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        images.push(InlineImage {
            mime_type: guess_image_mime(&name).to_string(),
            data,
        });
    }

    let client = GeminiClient::with_base_url(
        &config.gemini_api_key,
        &config.gemini_model,
        config.request_timeout_secs,
        &config.gemini_base_url,
    )?;
    let metrics = client.extract_metrics(&images).await?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

pub(crate) async fn run_resolve_path(
    config: &AppConfig,
    root: Option<&str>,
    segments: Vec<String>,
) -> anyhow::Result<()> {
    let tokens = ServiceAccountTokens::from_json(&config.google_credentials_json)?;
    let drive = DriveClient::with_base_url(
        Arc::new(tokens),
        config.request_timeout_secs,
        &config.drive_base_url,
    )?;

    let root = root.unwrap_or(&config.drive_root_folder_id);
    let path = FolderPath::new(segments);
    let folder_id = drive
        .resolve_path(root, &path)
        .await
        .with_context(|| format!("failed to resolve '{path}' under {root}"))?;
    println!("{folder_id}");
    Ok(())
}

pub(crate) fn run_check_config(config: &AppConfig) {
    println!("{config:#?}");
}
