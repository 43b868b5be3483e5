//! The browser form and its script, compiled into the binary.

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};

use super::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const APP_JS: &str = include_str!("../../static/app.js");

/// Placeholder in `index.html` replaced with the spreadsheet URL.
const SHEET_URL_SLOT: &str = "{{SHEET_URL}}";

pub(super) async fn index(State(state): State<AppState>) -> Html<String> {
    let sheet_url = format!(
        "https://docs.google.com/spreadsheets/d/{}",
        escape_attr(&state.config.sheet_id)
    );
    Html(INDEX_HTML.replace(SHEET_URL_SLOT, &sheet_url))
}

pub(super) async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        APP_JS,
    )
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
