//! HTTP routes and handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use snapclass_classifiers::ServiceState;
use snapclass_core::{ClassificationResult, ErrorKind};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Multipart field carrying the uploaded image
const FILE_FIELD: &str = "file";

const SERVICE_NAME: &str = "SnapClass Image Classification API";

// ============================================================================
// Prediction endpoint
// ============================================================================

/// Classify an uploaded image
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    metrics::counter!("snapclass_requests_total", "endpoint" => "predict").increment(1);

    if let ServiceState::Degraded { reason } = state.service.state() {
        warn!("Rejecting prediction, model unavailable");
        return Err(AppError::ModelUnavailable(reason));
    }

    let limit = state.config.max_upload_bytes;
    let bytes = read_image_field(&mut multipart, limit).await?;
    info!("Received image upload of {} bytes", bytes.len());

    let result = state.service.classify(&bytes).await;
    let status = status_for(&result);
    Ok((status, Json(result)).into_response())
}

/// Pull the `file` field out of the form, enforcing type and size limits
async fn read_image_field(multipart: &mut Multipart, limit: usize) -> Result<Vec<u8>, AppError> {
    let multipart_err = |e: MultipartError| AppError::from_multipart(e, limit);

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_err)? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::InvalidContentType(content_type));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_err)? {
            let size = bytes.len() + chunk.len();
            if size > limit {
                return Err(AppError::Oversize { size: Some(size), limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(AppError::MissingFile)
}

fn status_for(result: &ClassificationResult) -> StatusCode {
    match result.kind() {
        None => StatusCode::OK,
        Some(ErrorKind::DecodeError) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::OversizeError) => StatusCode::PAYLOAD_TOO_LARGE,
        Some(ErrorKind::InitializationError) => StatusCode::SERVICE_UNAVAILABLE,
        Some(ErrorKind::TransformError) | Some(ErrorKind::InferenceError) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// ============================================================================
// Status endpoints
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.service;
    let labels = service.labels();

    let mut status = json!({
        "status": if service.is_ready() { "healthy" } else { "unhealthy" },
        "service": SERVICE_NAME,
        "model_loaded": service.is_ready(),
        "system": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "version": env!("CARGO_PKG_VERSION"),
        "framework": "candle",
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "labels": {
            "count": labels.len(),
            "source": labels.source().to_string(),
            "fallback": labels.is_fallback(),
        },
    });

    match service.state() {
        ServiceState::Ready => {
            status["model"] = json!(service.model_name());
            status["device"] = json!(service.device_name());
        }
        ServiceState::Degraded { reason } => {
            status["degraded_reason"] = json!(reason);
        }
    }

    Json(status)
}

pub async fn test_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "service is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model_loaded": state.service.is_ready(),
    }))
}

/// Machine-readable summary of the HTTP API
pub async fn api_docs(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            {
                "method": "POST",
                "path": "/predict",
                "description": "Classify an image sent as multipart field 'file'",
                "max_upload_bytes": state.config.max_upload_bytes,
                "top_k": state.config.top_k,
            },
            { "method": "GET", "path": "/health", "description": "Model and label status" },
            { "method": "GET", "path": "/test", "description": "Liveness check with timestamp" },
            { "method": "GET", "path": "/metrics", "description": "Prometheus metrics" },
            { "method": "GET", "path": "/docs", "description": "This document" },
            { "method": "GET", "path": "/", "description": "Browser upload UI" },
        ],
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    ModelUnavailable(String),
    MissingFile,
    InvalidContentType(String),
    Oversize { size: Option<usize>, limit: usize },
    Multipart(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        metrics::counter!("snapclass_rejections_total", "reason" => self.reason()).increment(1);

        let (status, body) = match self {
            AppError::ModelUnavailable(reason) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!(ClassificationResult::failure(
                    ErrorKind::InitializationError,
                    format!("model unavailable: {}", reason),
                )),
            ),
            AppError::Oversize { size, limit } => {
                let error = match size {
                    Some(size) => format!("upload of at least {} bytes exceeds the {} byte limit", size, limit),
                    None => format!("upload exceeds the {} byte limit", limit),
                };
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    json!(ClassificationResult::failure(ErrorKind::OversizeError, error)),
                )
            }
            AppError::MissingFile => (
                StatusCode::BAD_REQUEST,
                client_error("missing_file", "multipart field 'file' is required"),
            ),
            AppError::InvalidContentType(content_type) => (
                StatusCode::BAD_REQUEST,
                client_error(
                    "invalid_content_type",
                    &format!("expected an image upload, got '{}'", content_type),
                ),
            ),
            AppError::Multipart(msg) => (StatusCode::BAD_REQUEST, client_error("invalid_request", &msg)),
        };

        (status, Json(body)).into_response()
    }
}

impl AppError {
    /// The body limit layer surfaces oversize uploads as multipart errors
    fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::Oversize { size: None, limit }
        } else {
            AppError::Multipart(err.body_text())
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            AppError::ModelUnavailable(_) => "model_unavailable",
            AppError::MissingFile => "missing_file",
            AppError::InvalidContentType(_) => "invalid_content_type",
            AppError::Oversize { .. } => "oversize",
            AppError::Multipart(_) => "invalid_request",
        }
    }
}

fn client_error(kind: &str, message: &str) -> serde_json::Value {
    json!({
        "success": false,
        "kind": kind,
        "error": message,
        "message": "please upload an image file",
    })
}
