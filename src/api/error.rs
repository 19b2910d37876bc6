//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Upstream service failed: {0}")]
    UpstreamFailed(String),
    #[error("Search timed out after {0}s")]
    Timeout(u64),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::UpstreamFailed(detail) => {
                tracing::warn!(detail, "Upstream failure surfaced to caller");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_FAILED",
                    detail.clone(),
                )
            }
            ApiError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                format!("Search did not complete within {secs}s"),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Timeout(secs) => ApiError::Timeout(secs),
            PipelineError::Description(_)
            | PipelineError::Arbitration(_)
            | PipelineError::Upload(_)
            | PipelineError::EmptyQuery => ApiError::UpstreamFailed(err.to_string()),
        }
    }
}
