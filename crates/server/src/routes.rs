use crate::{error::ApiError, state::AppState};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::Html,
    routing::{get, post},
};
use detector::backend::DetectorBackend;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

/// Upload cap for a single frame
const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

const FRAME_FIELD: &str = "video_frame";

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionPayload {
    pub label: String,
    pub confidence: f32,
    pub bbox: [i32; 4],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detections: Vec<DetectionPayload>,
}

pub fn app<B>(state: AppState<B>) -> Router
where
    B: DetectorBackend + Send + 'static,
{
    Router::new()
        .route("/", get(home))
        .route("/detect", post(detect::<B>))
        .layer(DefaultBodyLimit::max(MAX_FRAME_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn home() -> Html<&'static str> {
    Html("<h2>Object Detection Server Running</h2><p>Use POST /detect with image</p>")
}

async fn detect<B>(
    State(state): State<AppState<B>>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError>
where
    B: DetectorBackend + Send + 'static,
{
    // A broken or truncated multipart stream never forms a decodable frame
    let mut frame_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::InvalidFrame)?
    {
        if field.name() == Some(FRAME_FIELD) {
            frame_bytes = Some(field.bytes().await.map_err(|_| ApiError::InvalidFrame)?);
            break;
        }
    }
    let bytes = frame_bytes.ok_or(ApiError::MissingFrame)?;

    let frame = image::load_from_memory(&bytes)
        .map_err(|_| ApiError::InvalidFrame)?
        .to_rgb8();
    let (width, height) = frame.dimensions();

    // Inference is synchronous; keep it off the async executor
    let detector = state.detector.clone();
    let detections = tokio::task::spawn_blocking(move || detector.detect(&frame))
        .await
        .map_err(|e| anyhow::anyhow!("Inference task failed: {e}"))??;

    tracing::info!(
        count = detections.len(),
        "Detected {} object(s)",
        detections.len()
    );

    let detections = detections
        .into_iter()
        .map(|d| DetectionPayload {
            label: d.label().to_string(),
            confidence: d.confidence,
            bbox: d.pixel_bbox(width, height),
        })
        .collect();

    Ok(Json(DetectResponse { detections }))
}
