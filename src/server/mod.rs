use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::resolver::{ResolutionError, TranscriptMethod, TranscriptResolver, TranscriptResult, VideoId};

pub const MISSING_VIDEO_ID: &str = "Missing 'video_id' in request body";
pub const HEALTH_STATUS: &str = "YouTube Transcript Service is running!";

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<TranscriptResolver>,
}

/// Successful transcript response
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub success: bool,
    pub video_id: String,
    pub transcript: String,
    pub method: TranscriptMethod,
    pub length: usize,
}

impl From<TranscriptResult> for TranscriptResponse {
    fn from(result: TranscriptResult) -> Self {
        let length = result.length();
        Self {
            success: true,
            video_id: result.video_id,
            transcript: result.transcript,
            method: result.method,
            length,
        }
    }
}

/// Errors returned by the HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    MissingVideoId,
    InvalidBody(String),
    Resolution(ResolutionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingVideoId => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": MISSING_VIDEO_ID })),
            )
                .into_response(),
            ApiError::InvalidBody(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": message,
                    "type": "BadRequest",
                })),
            )
                .into_response(),
            ApiError::Resolution(err) => {
                let status = if err.is_classified() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (
                    status,
                    Json(serde_json::json!({
                        "success": false,
                        "error": err.to_string(),
                        "type": err.error_type(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/get-transcript", post(transcript_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the server until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Transcript service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Transcript service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Health check endpoint
async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({ "status": HEALTH_STATUS }))
}

async fn transcript_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let video_id = parse_video_id(&body)?;
    info!(video_id = %video_id, "Transcript requested");

    let result = state
        .resolver
        .resolve(&video_id)
        .await
        .map_err(ApiError::Resolution)?;

    Ok(Json(result.into()))
}

/// Pull `video_id` out of the request body. An empty body counts as missing.
fn parse_video_id(body: &[u8]) -> Result<VideoId, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingVideoId);
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidBody(format!("Invalid JSON body: {}", e)))?;

    value
        .get("video_id")
        .and_then(Value::as_str)
        .and_then(VideoId::parse)
        .ok_or(ApiError::MissingVideoId)
}
