//! HTTP surface: `GET /`, `GET /health` and `POST /extract`.
//!
//! `get` routes answer `HEAD` as well, with the body stripped.

use crate::error::ExtractError;
use crate::extract::Extractor;
use crate::output::ExtractionResponse;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Multipart field carrying the uploaded PDF.
pub const FILE_FIELD: &str = "file";

/// State shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
}

impl AppState {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }
}

/// Build the router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = match state.extractor.config().max_upload_bytes {
        Some(n) => DefaultBodyLimit::max(n),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/extract", post(extract))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serve on an already-bound listener until the process is stopped.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, build_router(state)).await
}

/// Bind `addr` and serve.
pub async fn start_server(addr: &str, state: AppState) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    serve(listener, state).await
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// Service banner
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Food Allergen & Nutrition Extractor API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/extract": "POST - Upload PDF file for extraction"
        }
    }))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Accept a multipart upload and run the extraction pipeline on it.
pub async fn extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::Upload {
        status: rejection.status(),
        detail: rejection.body_text(),
    })?;

    let (filename, bytes) = loop {
        let Some(field) = multipart.next_field().await.map_err(ApiError::from)? else {
            return Err(ExtractError::invalid_input(format!(
                "Missing multipart field '{FILE_FIELD}'"
            ))
            .into());
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(ApiError::from)?;
        break (filename, bytes);
    };

    let response = state.extractor.process(&filename, bytes.to_vec()).await?;
    Ok(Json(response))
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: String,
    stage: &'a str,
}

/// Failure of a request, as rendered to the client.
#[derive(Debug)]
pub enum ApiError {
    /// The pipeline rejected the upload or failed while processing it.
    Extract(ExtractError),
    /// The multipart body itself could not be read.
    Upload { status: StatusCode, detail: String },
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        ApiError::Extract(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Upload {
            status: e.status(),
            detail: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Extract(e) => e.into_response(),
            ApiError::Upload { status, detail } => {
                warn!("Rejected upload ({}): {}", status, detail);
                let body = ErrorBody {
                    detail,
                    stage: "validation",
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl IntoResponse for ExtractError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            warn!("Client error [{}]: {}", self.stage(), self);
            StatusCode::BAD_REQUEST
        } else {
            error!("Processing error [{}]: {}", self.stage(), self);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            detail: self.to_string(),
            stage: self.stage(),
        };
        (status, Json(body)).into_response()
    }
}
