//! Google Sheets v4 client for appending result rows.

use std::sync::Arc;

use postmetrics_core::OutputRow;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::auth::TokenSource;
use crate::error::GoogleError;
use crate::http::{build_client, join_segments, parse_base_url, send_json};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/";

const SERVICE: &str = "Sheets";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    major_dimension: &'static str,
    values: [&'a OutputRow; 1],
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendOutcome>,
}

/// What the API reports about an append.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOutcome {
    /// A1 range the row landed in, e.g. `'Master_Data'!A42:R42`.
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
}

/// Appends rows to one worksheet of one spreadsheet.
pub struct SheetsClient {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    base_url: Url,
    spreadsheet_id: String,
    worksheet: String,
}

impl SheetsClient {
    /// # Errors
    ///
    /// Returns [`GoogleError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        spreadsheet_id: &str,
        worksheet: &str,
        timeout_secs: u64,
    ) -> Result<Self, GoogleError> {
        Self::with_base_url(tokens, spreadsheet_id, worksheet, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`GoogleError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`GoogleError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        tokens: Arc<dyn TokenSource>,
        spreadsheet_id: &str,
        worksheet: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GoogleError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            tokens,
            base_url: parse_base_url(base_url)?,
            spreadsheet_id: spreadsheet_id.to_owned(),
            worksheet: worksheet.to_owned(),
        })
    }

    #[must_use]
    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    /// Appends `row` after the last non-empty row of the worksheet. Values
    /// are written as-is (`RAW`), never parsed as formulas.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] on auth, network or API failure (for example
    /// an unknown worksheet name).
    pub async fn append_row(&self, row: &OutputRow) -> Result<AppendOutcome, GoogleError> {
        let range = format!("{}:append", a1_anchor(&self.worksheet));
        let url = join_segments(
            &self.base_url,
            &[
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range.as_str(),
            ],
        )?;
        let token = self.tokens.access_token().await?;

        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&ValueRange {
                major_dimension: "ROWS",
                values: [row],
            });
        let response: AppendResponse = send_json(SERVICE, "values.append", request).await?;
        let outcome = response.updates.unwrap_or_default();

        tracing::info!(
            worksheet = %self.worksheet,
            range = outcome.updated_range.as_deref().unwrap_or("?"),
            "appended row to sheet"
        );
        Ok(outcome)
    }
}

/// `'<worksheet>'!A1`, doubling any single quote in the title.
fn a1_anchor(worksheet: &str) -> String {
    format!("'{}'!A1", worksheet.replace('\'', "''"))
}
