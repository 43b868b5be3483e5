//! Router tests: every request runs in-process through `build_app`, with
//! Gemini, Drive and Sheets served by one wiremock server.

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use postmetrics_core::{AppConfig, Environment};
use postmetrics_google::StaticToken;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{any, body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{build_app, AppState};
use crate::pipeline::Services;

const GENERATE_PATH: &str = "/v1beta/models/gemini-test:generateContent";
const FILES_PATH: &str = "/drive/v3/files";
const UPLOAD_PATH: &str = "/upload/drive/v3/files";
const APPEND_PATH: &str = r"^/v4/spreadsheets/sheet-123/values/.*:append$";
const POST_LINK: &str = "https://drive.google.com/drive/folders/post-1";
const BOUNDARY: &str = "XPOSTMETRICSX";

fn test_config(backend: &str, spool_dir: &Path) -> AppConfig {
    AppConfig {
        env: Environment::Development,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "debug".to_string(),
        gemini_api_key: "test-key".to_string(),
        gemini_model: "gemini-test".to_string(),
        gemini_base_url: backend.to_string(),
        drive_root_folder_id: "root-1".to_string(),
        drive_base_url: backend.to_string(),
        sheet_id: "sheet-123".to_string(),
        worksheet_name: "Master_Data".to_string(),
        sheets_base_url: backend.to_string(),
        google_credentials_json: String::new(),
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        spool_dir: spool_dir.to_path_buf(),
    }
}

struct Harness {
    backend: MockServer,
    spool: TempDir,
    app: Router,
}

impl Harness {
    async fn start() -> Self {
        let backend = MockServer::start().await;
        let spool = tempfile::tempdir().unwrap();
        let config = test_config(&backend.uri(), spool.path());
        let services =
            Services::with_tokens(&config, Arc::new(StaticToken::new("test-token"))).unwrap();
        let app = build_app(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        });
        Self {
            backend,
            spool,
            app,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn spool_is_empty(&self) -> bool {
        std::fs::read_dir(self.spool.path()).unwrap().next().is_none()
    }

    /// Bodies of every recorded request whose path is `path`.
    async fn bodies_for(&self, path: &str) -> Vec<Value> {
        self.backend
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == path)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    async fn appended_rows(&self) -> Vec<Value> {
        self.backend
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path().ends_with(":append"))
            .map(|r| {
                let body: Value = serde_json::from_slice(&r.body).unwrap();
                body["values"][0].clone()
            })
            .collect()
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn acme_fields() -> Self {
        Self::default()
            .text("client_name", "Acme")
            .text("campaign_name", "Launch")
            .text("influencer_name", "Jane")
            .text("platform", "Instagram")
            .text("format", "Story")
            .text("organic_paid", "Organic")
            .text("content_id", "")
    }

    fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

fn gemini_answer(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
}

async fn mount_gemini_metrics(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_answer(
            r#"{"likes": "2.5K", "comments": 41, "views": 12000, "reach": 10300,
                "shares": null, "saves": null, "link_clicks": null, "clicks_stickers": null,
                "extraction_notes": "Extracción exitosa."}"#,
        )))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_sheet_append(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path_regex(APPEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "updates": { "updatedRange": "'Master_Data'!A2:R2", "updatedRows": 1 }
        })))
        .expect(times)
        .mount(server)
        .await;
}

fn is_post_folder_name(name: &str) -> bool {
    let Some(stamp) = name.strip_prefix("General - ") else {
        return false;
    };
    let bytes = stamp.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Static routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_serves_form_with_sheet_link() {
    let harness = Harness::start().await;
    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("id=\"metric-form\""));
    assert!(html.contains("data-sheet-url=\"https://docs.google.com/spreadsheets/d/sheet-123\""));
}

#[tokio::test]
async fn script_is_served_as_javascript() {
    let harness = Harness::start().await;
    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/static/app.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/javascript"));
}

#[tokio::test]
async fn health_reports_ok() {
    let harness = Harness::start().await;
    let (status, body) = harness
        .send(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_without_files_is_rejected_before_any_backend_call() {
    let harness = Harness::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&harness.backend)
        .await;

    let (status, body) = harness
        .send(MultipartForm::acme_fields().into_request())
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        serde_json::json!({ "status": "error", "message": "No se recibieron archivos." })
    );
    assert!(harness.spool_is_empty());
}

#[tokio::test]
async fn empty_file_part_counts_as_no_files() {
    let harness = Harness::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&harness.backend)
        .await;

    let request = MultipartForm::acme_fields()
        .file("metric_images[]", "", b"")
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No se recibieron archivos.");
}

#[tokio::test]
async fn missing_required_field_names_the_field() {
    let harness = Harness::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&harness.backend)
        .await;

    let request = MultipartForm::default()
        .text("campaign_name", "Launch")
        .file("metric_images[]", "a.png", b"png")
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Falta el campo obligatorio: client_name.");
    assert!(harness.spool_is_empty());
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let harness = Harness::start().await;
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn upload_over_body_limit_is_payload_too_large() {
    let harness = Harness::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&harness.backend)
        .await;

    let oversized = vec![0u8; 2 * 1024 * 1024];
    let request = MultipartForm::acme_fields()
        .file("metric_images[]", "big.png", &oversized)
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body,
        serde_json::json!({
            "status": "error",
            "message": "Los archivos superan el tamaño máximo permitido."
        })
    );
    assert!(harness.spool_is_empty());
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn end_to_end_submission_appends_one_row() {
    let harness = Harness::start().await;
    let server = &harness.backend;
    mount_gemini_metrics(server).await;

    Mock::given(method("GET"))
        .and(path(FILES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(FILES_PATH))
        .and(body_string_contains("\"name\":\"General - "))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "post-1",
            "webViewLink": POST_LINK
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(FILES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "level"
        })))
        .expect(5)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "file" })))
        .expect(2)
        .mount(server)
        .await;
    mount_sheet_append(server, 1).await;

    let request = MultipartForm::acme_fields()
        .file("metric_images[]", "story 1.png", b"first")
        .file("metric_images[]", "story 2.png", b"second")
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Lote procesado y guardado con éxito.");
    assert_eq!(body["processed_data"]["metrics"]["likes"], 2500);
    assert_eq!(body["processed_data"]["metrics"]["reach"], 10300);
    assert_eq!(body["processed_data"]["drive_folder_link"], POST_LINK);

    let created: Vec<String> = harness
        .bodies_for(FILES_PATH)
        .await
        .iter()
        .filter_map(|b| b["name"].as_str().map(str::to_string))
        .collect();
    assert_eq!(
        &created[..5],
        &["Acme", "Launch", "Jane", "Instagram", "Story"]
    );
    assert!(is_post_folder_name(&created[5]), "got {}", created[5]);

    let rows = harness.appended_rows().await;
    assert_eq!(rows.len(), 1);
    let row = rows[0].as_array().unwrap();
    assert_eq!(row.len(), 18);
    assert_eq!(row[1], "Acme");
    assert_eq!(row[6], "");
    assert_eq!(row[7], "Organic");
    assert_eq!(row[8], 10300);
    assert_eq!(row[10], 2500);
    assert_eq!(row[13], "");
    assert_eq!(row[16], POST_LINK);
    assert_eq!(row[17], "Extracción exitosa.");

    assert!(harness.spool_is_empty());
}

#[tokio::test]
async fn overloaded_model_is_503_and_appends_nothing() {
    let harness = Harness::start().await;
    let server = &harness.backend;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(path_regex(r"^/(drive|upload|v4)/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;

    let request = MultipartForm::acme_fields()
        .file("metric_images[]", "a.png", b"png")
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        serde_json::json!({
            "status": "error",
            "message": "El servicio de IA está sobrecargado. Por favor, inténtalo de nuevo en unos minutos."
        })
    );
    assert!(harness.spool_is_empty());
}

#[tokio::test]
async fn unreadable_model_answer_is_500_with_error_text() {
    let harness = Harness::start().await;
    let server = &harness.backend;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_answer("no JSON here")))
        .mount(server)
        .await;
    mount_sheet_append(server, 0).await;

    let request = MultipartForm::acme_fields()
        .file("metric_images[]", "a.png", b"png")
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("model answer"));
}

#[tokio::test]
async fn storage_failure_still_appends_row_without_link() {
    let harness = Harness::start().await;
    let server = &harness.backend;
    mount_gemini_metrics(server).await;

    Mock::given(path_regex(r"^/(drive|upload)/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "code": 500, "message": "Internal Error" }
        })))
        .mount(server)
        .await;
    mount_sheet_append(server, 1).await;

    let request = MultipartForm::acme_fields()
        .file("metric_images[]", "a.png", b"png")
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["processed_data"]["drive_folder_link"], Value::Null);

    let rows = harness.appended_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][16], "");
}

#[tokio::test]
async fn sheet_failure_is_500() {
    let harness = Harness::start().await;
    let server = &harness.backend;
    mount_gemini_metrics(server).await;

    Mock::given(method("GET"))
        .and(path(FILES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{ "id": "existing" }]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(FILES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "post-1",
            "webViewLink": POST_LINK
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "file" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(APPEND_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "The caller does not have permission" }
        })))
        .mount(server)
        .await;

    let request = MultipartForm::acme_fields()
        .file("metric_images[]", "a.png", b"png")
        .into_request();
    let (status, body) = harness.send(request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("The caller does not have permission"));
    assert!(harness.spool_is_empty());
}
