use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Error taxonomy for the two API operations. Every failure of an
/// asynchronous operation is folded into one of these before it reaches
/// a caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed request input, user-correctable.
    #[error("{0}")]
    InvalidInput(String),

    /// The transcript provider or completion service failed.
    #[error("{message}: {details}")]
    UpstreamUnavailable { message: String, details: String },

    /// The video has no usable transcript.
    #[error("no transcript available for this video")]
    EmptyResult,
}

impl ApiError {
    pub fn upstream(message: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::UpstreamUnavailable {
            message: message.into(),
            details: details.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::upstream("request to upstream service failed", err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::UpstreamUnavailable { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message, "details": details })),
            )
                .into_response(),
            ApiError::EmptyResult => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": ApiError::EmptyResult.to_string() })),
            )
                .into_response(),
        }
    }
}
