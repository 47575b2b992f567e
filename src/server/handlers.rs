use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{error, info};

use super::SharedState;
use crate::error::{AppError, SessionError};
use crate::llm::{with_idle_timeout, within};
use crate::modes::{AnalyzeParams, ChatParams, ProgressParams};
use crate::session::{IdeaAnalysis, ValidationReport};

/// An [`AppError`] rendered as `{"error": ...}` with its HTTP status.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /api/analyze`
pub async fn analyze_handler(
    State(state): State<SharedState>,
    Json(params): Json<AnalyzeParams>,
) -> Result<Json<IdeaAnalysis>, ApiError> {
    let analysis = state.analyzer.analyze(&params).await?;
    Ok(Json(analysis))
}

/// `POST /api/progress`
pub async fn progress_handler(
    State(state): State<SharedState>,
    Json(params): Json<ProgressParams>,
) -> Result<Json<ValidationReport>, ApiError> {
    let report = state
        .evaluator
        .evaluate(&params.history, &params.idea, params.stage)
        .await?;
    Ok(Json(report))
}

/// `POST /api/chat`
///
/// Streams the raw model fragments as a chunked body. The client does the
/// previewing and finalization; failures after the first byte, including
/// an upstream that goes silent, just end the body early.
pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(params): Json<ChatParams>,
) -> Response {
    let start = Instant::now();

    if params.message.trim().is_empty() {
        return ApiError(
            SessionError::Validation {
                field: "message".to_string(),
                reason: "Message is required".to_string(),
            }
            .into(),
        )
        .into_response();
    }

    let idle = Duration::from_millis(state.config.request.stream_idle_timeout_ms);
    let opening = state.chat.stream_reply(&params.message, &params.history);
    let stream = match within(idle, opening).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "Chat stream failed to open");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal Server Error",
                    "details": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    info!(
        history_turns = params.history.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Chat stream opened"
    );

    let body = Body::from_stream(
        with_idle_timeout(stream, idle)
            .inspect_err(|e| error!(error = %e, "Chat stream interrupted")),
    );
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
