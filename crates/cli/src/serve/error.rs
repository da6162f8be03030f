//! API error envelope.
//!
//! Every failure leaves the gateway as
//! `{"error": {"code", "message", "issues"?}, "correlationId"}`.

use std::any::Any;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use specifys_core::{Issue, UpstreamError};

use super::correlation_id;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("model output failed validation after {attempts} attempts")]
    InvalidModelOutput { issues: Vec<Issue>, attempts: usize },

    #[error("OpenAI upstream error: HTTP {}", .0.status)]
    Upstream(UpstreamError),

    #[error("screen analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("mockup generation failed: {0}")]
    GenerationFailed(String),

    #[error("{0}")]
    Server(String),
}

impl ApiError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidModelOutput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::AnalysisFailed(_)
            | ApiError::GenerationFailed(_)
            | ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidModelOutput { .. } => "INVALID_MODEL_OUTPUT",
            ApiError::Upstream(_) => "OPENAI_UPSTREAM_ERROR",
            ApiError::AnalysisFailed(_) => "ANALYSIS_FAILED",
            ApiError::GenerationFailed(_) => "GENERATION_FAILED",
            ApiError::Server(_) => "SERVER_ERROR",
        }
    }

    /// Render the envelope, tagging it with the request's correlation id.
    pub(crate) fn into_response_with(self, correlation_id: &str) -> Response {
        let status = self.status();
        match &self {
            ApiError::Upstream(upstream) => warn!(
                correlation_id,
                status = upstream.status,
                body = %upstream.body,
                "upstream generation API error"
            ),
            ApiError::InvalidModelOutput { issues, attempts } => warn!(
                correlation_id,
                attempts,
                issues = issues.len(),
                "model output rejected after retry budget"
            ),
            other => warn!(correlation_id, code = other.code(), error = %other, "request failed"),
        }

        let mut error = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::InvalidModelOutput { issues, .. } = &self {
            error["issues"] = serde_json::json!(issues);
        }

        let body = serde_json::json!({
            "error": error,
            "correlationId": correlation_id,
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid JSON body: {}", rejection.body_text()))
    }
}

/// Turn a handler panic into the standard 500 envelope.
pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    let correlation_id = correlation_id();
    error!(correlation_id, panic = detail, "handler panicked");
    ApiError::Server("internal server error".into()).into_response_with(&correlation_id)
}
