//! Mapping from a processed submission to the spreadsheet's fixed columns.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::metrics::ConsolidatedMetrics;
use crate::submission::Submission;

/// Column order of the `Master_Data` worksheet. Appended rows must match it
/// exactly; the sheet has no header lookup.
pub const ROW_COLUMNS: [&str; 18] = [
    "timestamp",
    "client_name",
    "campaign_name",
    "influencer_name",
    "platform",
    "format",
    "content_id",
    "organic_paid",
    "reach",
    "views",
    "likes",
    "comments",
    "saves",
    "shares",
    "link_clicks",
    "clicks_stickers",
    "evidence_link",
    "extraction_notes",
];

/// One append-only spreadsheet row. Missing values are empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputRow(Vec<Value>);

impl OutputRow {
    #[must_use]
    pub fn cells(&self) -> &[Value] {
        &self.0
    }

    /// Cell for a named column, if the name is one of [`ROW_COLUMNS`].
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        ROW_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.0.get(i))
    }
}

/// Builds the row for one submission. Pure; `at` is the row timestamp.
#[must_use]
pub fn build_row(
    submission: &Submission,
    metrics: &ConsolidatedMetrics,
    evidence_link: Option<&str>,
    at: NaiveDateTime,
) -> OutputRow {
    let text = |s: &str| Value::String(s.to_string());
    let count = |n: Option<u64>| n.map_or_else(|| text(""), Value::from);

    OutputRow(vec![
        Value::String(at.format("%Y-%m-%d %H:%M:%S").to_string()),
        text(&submission.client_name),
        text(&submission.campaign_name),
        text(&submission.influencer_name),
        text(&submission.platform),
        text(&submission.format),
        text(submission.content_id.as_deref().unwrap_or_default()),
        text(&submission.organic_paid),
        count(metrics.reach),
        count(metrics.views),
        count(metrics.likes),
        count(metrics.comments),
        count(metrics.saves),
        count(metrics.shares),
        count(metrics.link_clicks),
        count(metrics.clicks_stickers),
        text(evidence_link.unwrap_or_default()),
        text(metrics.extraction_notes.as_deref().unwrap_or_default()),
    ])
}
