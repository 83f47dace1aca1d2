//! HTTP surface: JSON in, JSON out.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use facecheck_core::{embedding_from_json, BgrImage, ImageInput, VerifyError, VerifyOptions, VerifyParams};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::{EngineError, EngineHandle};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("{0}")]
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Verify(e) => AppError::Verify(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Verify(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Verify(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    engine: EngineHandle,
    models: Vec<String>,
}

impl AppState {
    pub fn new(engine: EngineHandle, models: Vec<String>) -> Self {
        Self { engine, models }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/video_feed", post(video_feed))
        .route("/verify", post(verify))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct VideoFeedRequest {
    image: Option<String>,
}

/// One side of a `/verify` request: an encoded image or an embedding.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireImage {
    Encoded(String),
    Embedding(Vec<serde_json::Value>),
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    img1: Option<WireImage>,
    img2: Option<WireImage>,
    #[serde(flatten)]
    params: VerifyParams,
}

/// Decode a base64 image, with or without a `data:image/...;base64,` prefix.
pub fn decode_base64_image(encoded: &str) -> Result<BgrImage, AppError> {
    let payload = match encoded.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    // MIME encoders wrap lines; the alphabet itself has no whitespace.
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| AppError::BadRequest(format!("invalid base64 image: {e}")))?;

    BgrImage::decode(&bytes).map_err(|e| AppError::BadRequest(format!("invalid image: {e}")))
}

fn to_input(image: Option<WireImage>, index: usize) -> Result<ImageInput, AppError> {
    match image {
        None => Err(AppError::BadRequest(format!("img{index} is required"))),
        Some(WireImage::Encoded(encoded)) => Ok(ImageInput::Pixels(decode_base64_image(&encoded)?)),
        Some(WireImage::Embedding(values)) => Ok(ImageInput::Embedding(embedding_from_json(&values, index)?)),
    }
}

async fn video_feed(
    State(state): State<AppState>,
    payload: Result<Json<VideoFeedRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let encoded = request
        .image
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("no image provided".to_string()))?;

    let image = decode_base64_image(&encoded)?;
    tracing::debug!(width = image.width(), height = image.height(), "video_feed image decoded");

    let prediction = state.engine.classify(image).await?;
    let label = prediction.dominant.display_label();

    Ok(([("x-emotion", label)], Json(json!({ "emotion": label }))).into_response())
}

async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let options = VerifyOptions::try_from(request.params)?;
    let img1 = to_input(request.img1, 1)?;
    let img2 = to_input(request.img2, 2)?;

    let result = state.engine.verify(img1, img2, options).await?;
    Ok(Json(result).into_response())
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "models": state.models,
    }))
}
