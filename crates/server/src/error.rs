use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Everything the detect handler can fail with, translated to an HTTP
/// response in exactly one place.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The multipart form carried no `video_frame` field.
    #[error("No video frame provided")]
    MissingFrame,
    /// The uploaded bytes did not decode to an image.
    #[error("Invalid frame data")]
    InvalidFrame,
    /// Inference or task failure; the client sees the error's display string.
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFrame | ApiError::InvalidFrame => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        tracing::error!(status = %status, error = %message, "Error processing frame");
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_use_exact_messages() {
        assert_eq!(ApiError::MissingFrame.to_string(), "No video frame provided");
        assert_eq!(ApiError::InvalidFrame.to_string(), "Invalid frame data");
    }

    #[test]
    fn status_codes_split_client_and_server_errors() {
        assert_eq!(ApiError::MissingFrame.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidFrame.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
