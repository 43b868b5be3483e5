//! Consolidated engagement metrics and the lenient parsing applied to model
//! output.
//!
//! The vision model is asked to return plain integers, but in practice it
//! sometimes echoes what is printed on the screenshot (`"2.5K"`, `"1,2 mil"`)
//! or returns one object per image. Everything here normalizes that into a
//! single [`ConsolidatedMetrics`] using max-value-wins.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Written into `extraction_notes` when the model found nothing and did not
/// explain why.
pub const NO_METRICS_NOTE: &str =
    "Las imágenes no contienen contadores numéricos visibles de métricas.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricParseError {
    #[error("empty metric value")]
    Empty,

    #[error("not a metric value: '{0}'")]
    Invalid(String),

    #[error("metric value out of range: '{0}'")]
    OutOfRange(String),
}

/// The single reconciled set of engagement numbers for one submission.
///
/// Every count is independently optional: `None` means the metric was not
/// visible in any image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedMetrics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub likes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub comments: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub shares: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub saves: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub views: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reach: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub link_clicks: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub clicks_stickers: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub extraction_notes: Option<String>,
}

impl ConsolidatedMetrics {
    /// Builds metrics from the model's decoded JSON.
    ///
    /// An object is read directly. An array is treated as one object per
    /// image and folded with [`ConsolidatedMetrics::merge_max`]. The result
    /// always satisfies [`ConsolidatedMetrics::ensure_notes`].
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the value is neither an object nor an
    /// array of objects.
    pub fn from_model_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut metrics = match value {
            Value::Object(_) => serde_json::from_value::<Self>(value)?,
            Value::Array(items) => {
                let mut merged = Self::default();
                for item in items {
                    let per_image = serde_json::from_value::<Self>(item)?;
                    merged.merge_max(&per_image);
                }
                merged
            }
            other => {
                return Err(<serde_json::Error as serde::de::Error>::custom(format!(
                    "expected a JSON object of metrics, got {}",
                    json_kind(&other)
                )))
            }
        };
        metrics.ensure_notes();
        Ok(metrics)
    }

    /// Folds `other` into `self`, keeping the larger value of every count.
    ///
    /// Notes are concatenated when both sides carry distinct text.
    pub fn merge_max(&mut self, other: &Self) {
        fn max_of(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (x, None) => x,
                (None, y) => y,
            }
        }

        self.likes = max_of(self.likes, other.likes);
        self.comments = max_of(self.comments, other.comments);
        self.shares = max_of(self.shares, other.shares);
        self.saves = max_of(self.saves, other.saves);
        self.views = max_of(self.views, other.views);
        self.reach = max_of(self.reach, other.reach);
        self.link_clicks = max_of(self.link_clicks, other.link_clicks);
        self.clicks_stickers = max_of(self.clicks_stickers, other.clicks_stickers);

        let theirs = other
            .extraction_notes
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(theirs) = theirs {
            match self.extraction_notes.as_deref().map(str::trim) {
                Some(ours) if !ours.is_empty() && ours != theirs => {
                    self.extraction_notes = Some(format!("{ours}; {theirs}"));
                }
                Some(ours) if !ours.is_empty() => {}
                _ => self.extraction_notes = Some(theirs.to_string()),
            }
        }
    }

    fn counts(&self) -> [(&'static str, Option<u64>); 8] {
        [
            ("likes", self.likes),
            ("comments", self.comments),
            ("shares", self.shares),
            ("saves", self.saves),
            ("views", self.views),
            ("reach", self.reach),
            ("link_clicks", self.link_clicks),
            ("clicks_stickers", self.clicks_stickers),
        ]
    }

    #[must_use]
    pub fn has_any_metric(&self) -> bool {
        self.counts().iter().any(|(_, v)| v.is_some())
    }

    /// Names of the counts that are still `None`, in column order.
    #[must_use]
    pub fn missing_metrics(&self) -> Vec<&'static str> {
        self.counts()
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Guarantees a non-empty explanation whenever a count is missing.
    ///
    /// With nothing found the generic note is used; otherwise the note lists
    /// the missing fields. Notes already present are left alone.
    pub fn ensure_notes(&mut self) {
        let blank = self
            .extraction_notes
            .as_deref()
            .is_none_or(|s| s.trim().is_empty());
        if !blank {
            return;
        }
        if !self.has_any_metric() {
            self.extraction_notes = Some(NO_METRICS_NOTE.to_string());
            return;
        }
        let missing = self.missing_metrics();
        if !missing.is_empty() {
            self.extraction_notes = Some(format!("No se encontraron: {}.", missing.join(", ")));
        }
    }
}

/// Parses a count as printed by social platforms into an integer.
///
/// Handles `K`/`M`/`B` suffixes and the Spanish `mil`, thousands separators
/// (`1,234` or `1.234`), and decimal commas (`2,5K`).
///
/// # Errors
///
/// Returns [`MetricParseError`] if the text is empty, not numeric, negative,
/// or too large for `u64`.
pub fn parse_metric_value(raw: &str) -> Result<u64, MetricParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let cleaned = cleaned.trim_start_matches('+');
    if cleaned.is_empty() {
        return Err(MetricParseError::Empty);
    }

    let (number, multiplier) = split_suffix(cleaned);
    if number.is_empty()
        || !number
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return Err(MetricParseError::Invalid(raw.to_string()));
    }

    let normalized = normalize_separators(number, multiplier > 1);
    let value: f64 = normalized
        .parse()
        .map_err(|_| MetricParseError::Invalid(raw.to_string()))?;

    #[allow(clippy::cast_precision_loss)]
    let (expanded, ceiling) = ((value * multiplier as f64).round(), u64::MAX as f64);
    if !expanded.is_finite() || expanded < 0.0 || expanded >= ceiling {
        return Err(MetricParseError::OutOfRange(raw.to_string()));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = expanded as u64;
    Ok(count)
}

fn split_suffix(s: &str) -> (&str, u64) {
    if let Some(n) = s.strip_suffix("mil") {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('k') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix('b') {
        (n, 1_000_000_000)
    } else {
        (s, 1)
    }
}

/// Rewrites `number` so that `.` is the only (decimal) separator.
///
/// With both separators present the rightmost one is the decimal mark. With
/// one kind present and no suffix, groups of exactly three digits mean
/// thousands; after a suffix it is always a decimal mark.
fn normalize_separators(number: &str, has_suffix: bool) -> String {
    let last_dot = number.rfind('.');
    let last_comma = number.rfind(',');
    match (last_dot, last_comma) {
        (None, None) => number.to_string(),
        (Some(d), Some(c)) => {
            let (decimal, thousands) = if d > c { ('.', ',') } else { (',', '.') };
            number.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => single_separator(number, '.', has_suffix),
        (None, Some(_)) => single_separator(number, ',', has_suffix),
    }
}

fn single_separator(number: &str, sep: char, has_suffix: bool) -> String {
    let groups: Vec<&str> = number.split(sep).collect();
    let grouped_thousands =
        !has_suffix && groups.len() >= 2 && groups[1..].iter().all(|g| g.len() == 3);
    if grouped_thousands || groups.len() > 2 {
        groups.concat()
    } else {
        number.replacen(sep, ".", 1)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            #[allow(clippy::cast_precision_loss)]
            let ceiling = u64::MAX as f64;
            n.as_f64()
                .map(f64::round)
                .filter(|f| f.is_finite() && *f >= 0.0 && *f < ceiling)
                .map(|f| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let rounded = f as u64;
                    rounded
                })
        }),
        Value::String(s) => parse_metric_value(s).ok(),
        _ => None,
    }
}

// Unparseable counts become `None` rather than failing the whole response.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;
