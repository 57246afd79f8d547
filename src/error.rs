use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single call to an upstream API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Connection failure, timeout, or a body that could not be decoded.
    /// The request URL is stripped since it carries the API key.
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Transport(e.without_url())
    }
}

impl UpstreamError {
    /// Text sent back to clients in the `details` field.
    pub fn details(&self) -> String {
        match self {
            UpstreamError::Transport(e) => e.to_string(),
            UpstreamError::Status { body, .. } => body.clone(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Transport(_) => None,
        }
    }
}

/// Errors surfaced at the HTTP boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: &'static str,
        #[source]
        source: UpstreamError,
    },

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl ApiError {
    /// Upstream failure reported as a 500 with the upstream text attached.
    pub fn upstream(message: &'static str, source: UpstreamError) -> ApiError {
        ApiError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            source,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Upstream {
                status,
                message,
                source,
            } => {
                tracing::error!("{message}: {source}");
                (
                    status,
                    Json(json!({ "error": message, "details": source.details() })),
                )
                    .into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request", "details": details })),
            )
                .into_response(),
        }
    }
}
