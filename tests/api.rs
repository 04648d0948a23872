//! HTTP integration tests for the extraction API.
//!
//! Each test serves the real router on an ephemeral port with in-memory
//! collaborators (no pdfium, Tesseract or LLM needed) and talks to it over
//! HTTP with `reqwest`.

use allergen_extractor::server::{self, AppState};
use allergen_extractor::{
    ExtractError, Extractor, ExtractorConfig, OcrEngine, PageRasterizer, SchemaPayload,
    SemanticExtractor, TextLayerParser,
};
use async_trait::async_trait;
use image::DynamicImage;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// A "PDF" whose pages are given up front.
struct FakePdf {
    pages: Vec<String>,
}

impl TextLayerParser for FakePdf {
    fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
        Ok(self.pages.clone())
    }
}

impl PageRasterizer for FakePdf {
    fn render_pages(&self, _pdf: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, ExtractError> {
        Ok(vec![DynamicImage::new_luma8(1, 1); self.pages.len()])
    }
}

struct BlankOcr;

impl OcrEngine for BlankOcr {
    fn recognize(&self, _image: &DynamicImage, _language: &str) -> Result<String, ExtractError> {
        Ok(String::new())
    }
}

/// Marks an allergen present when its name appears in the text.
#[derive(Default)]
struct KeywordModel {
    calls: AtomicUsize,
    fail_with: Option<String>,
}

#[async_trait]
impl SemanticExtractor for KeywordModel {
    async fn extract(&self, text: &str) -> Result<SchemaPayload, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.fail_with {
            return Err(ExtractError::Upstream {
                message: message.clone(),
            });
        }
        let lower = text.to_lowercase();
        SchemaPayload::from_value(&json!({
            "allergens": {
                "milk": lower.contains("milk"),
                "gluten": lower.contains("gluten"),
                "peanut": lower.contains("peanut"),
            },
            "nutritional_values": {
                "energy": lower.contains("250 kcal").then_some("250 kcal"),
            }
        }))
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

fn label_pages() -> Vec<String> {
    vec![format!(
        "Chocolate wafer. Contains milk and gluten. Energy: 250 kcal. {}",
        "Keep dry and away from heat. ".repeat(3)
    )]
}

/// Serve the router on 127.0.0.1:0 and return its base URL.
async fn spawn_app(
    config: ExtractorConfig,
    pages: Vec<String>,
    model: Arc<KeywordModel>,
) -> String {
    let pdf = Arc::new(FakePdf { pages });
    let extractor = Extractor::new(config, pdf.clone(), pdf, Arc::new(BlankOcr), model);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server::serve(listener, AppState::new(extractor))
            .await
            .expect("server failed");
    });

    format!("http://{addr}")
}

async fn spawn_default(pages: Vec<String>, model: Arc<KeywordModel>) -> String {
    spawn_app(ExtractorConfig::default(), pages, model).await
}

fn pdf_form(filename: &str, bytes: Vec<u8>) -> Form {
    let part = Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str("application/pdf")
        .unwrap();
    Form::new().part("file", part)
}

// ── Informational endpoints ──────────────────────────────────────────────────

#[tokio::test]
async fn test_root_banner() {
    let base = spawn_default(label_pages(), Arc::default()).await;

    let response = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(response.status(), 200);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["message"], "Food Allergen & Nutrition Extractor API");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(
        json["endpoints"]["/extract"],
        "POST - Upload PDF file for extraction"
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = spawn_default(label_pages(), Arc::default()).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_head_requests() {
    let base = spawn_default(label_pages(), Arc::default()).await;
    let client = reqwest::Client::new();

    for path in ["/", "/health"] {
        let response = client.head(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(response.status(), 200, "HEAD {path}");
        assert!(response.bytes().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let base = spawn_default(label_pages(), Arc::default()).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/health"))
        .header("Origin", "https://labels.example.org")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://labels.example.org"
    );
}

#[tokio::test]
async fn test_cors_preflight_for_extract() {
    let base = spawn_default(label_pages(), Arc::default()).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/extract"))
        .header("Origin", "https://labels.example.org")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "x-label-batch")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://labels.example.org"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert!(headers["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .contains("POST"));
    assert!(headers["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase()
        .contains("x-label-batch"));
}

// ── POST /extract ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_digital_label() {
    let model = Arc::new(KeywordModel::default());
    let base = spawn_default(label_pages(), model.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/extract"))
        .multipart(pdf_form("wafer.pdf", b"%PDF-1.7 fake".to_vec()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();

    assert_eq!(json["processing_method"], "text_extraction");
    assert_eq!(json["allergens"]["milk"], true);
    assert_eq!(json["allergens"]["gluten"], true);
    assert_eq!(json["allergens"]["peanut"], false);
    assert_eq!(json["allergens"].as_object().unwrap().len(), 10);
    assert_eq!(json["nutritional_values"]["energy"], "250 kcal");
    assert!(json["nutritional_values"]["sodium"].is_null());
    assert_eq!(json["nutritional_values"].as_object().unwrap().len(), 6);
    assert!(json["raw_text_preview"]
        .as_str()
        .unwrap()
        .starts_with("Chocolate wafer."));
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_extract_rejects_non_pdf() {
    let model = Arc::new(KeywordModel::default());
    let base = spawn_default(label_pages(), model.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/extract"))
        .multipart(pdf_form("wafer.docx", b"PK\x03\x04".to_vec()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["detail"], "Only PDF files are supported");
    assert_eq!(json["stage"], "validation");
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_extract_zero_page_pdf() {
    let model = Arc::new(KeywordModel::default());
    let base = spawn_default(vec![], model.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/extract"))
        .multipart(pdf_form("empty.pdf", b"%PDF-1.7".to_vec()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["detail"], "Could not extract any text from the PDF");
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_extract_missing_file_field() {
    let base = spawn_default(label_pages(), Arc::default()).await;

    let form = Form::new().text("comment", "no file here");
    let response = reqwest::Client::new()
        .post(format!("{base}/extract"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert!(json["detail"].as_str().unwrap().contains("'file'"));
}

#[tokio::test]
async fn test_extract_requires_multipart() {
    let base = spawn_default(label_pages(), Arc::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/extract"))
        .header("content-type", "application/json")
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["stage"], "validation");
}

#[tokio::test]
async fn test_extract_upstream_failure_is_500() {
    let model = Arc::new(KeywordModel {
        calls: AtomicUsize::new(0),
        fail_with: Some("insufficient_quota".into()),
    });
    let base = spawn_default(label_pages(), model).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/extract"))
        .multipart(pdf_form("wafer.pdf", b"%PDF-1.7".to_vec()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["stage"], "semantic_upstream");
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .contains("insufficient_quota"));
}

#[tokio::test]
async fn test_extract_body_limit() {
    let config = ExtractorConfig::builder()
        .max_upload_bytes(512)
        .build()
        .unwrap();
    let base = spawn_app(config, label_pages(), Arc::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/extract"))
        .multipart(pdf_form("big.pdf", vec![b'x'; 2048]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 413);
}
