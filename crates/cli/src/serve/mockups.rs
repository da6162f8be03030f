//! Mockup routes: batch, analysis-only, and single-screen generation.
//!
//! Mockups are best-effort. They get one model call per screen with no
//! repair round, and a failed screen is dropped from a batch rather than
//! failing it.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};

use specifys_core::mockup::{analyze_screens, generate_mockup, generate_mockups, normalize_screen};
use specifys_core::MockupContext;

use super::error::ApiError;
use super::state::AppState;
use super::{correlation_id, timestamp};

/// POST /generate-mockups
pub(crate) async fn handle_generate_mockups(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let correlation_id = correlation_id();
    match batch(&state, payload, &correlation_id).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response_with(&correlation_id),
    }
}

async fn batch(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
    correlation_id: &str,
) -> Result<Value, ApiError> {
    let context = parse_context(payload)?;

    let screens = analyze_screens(state.client.as_ref(), &context)
        .await
        .map_err(|e| ApiError::AnalysisFailed(e.to_string()))?;
    let screens_analyzed = screens.len();
    info!(correlation_id, screens = screens_analyzed, "generating mockups");

    let result = generate_mockups(
        Arc::clone(&state.client),
        Arc::new(context),
        screens,
        state.mockup_concurrency,
    )
    .await;

    if !result.failed.is_empty() {
        warn!(
            correlation_id,
            failed = ?result.failed,
            "some screens produced no mockup"
        );
    }

    Ok(json!({
        "mockups": result.mockups,
        "meta": {
            "count": result.mockups.len(),
            "screensAnalyzed": screens_analyzed,
            "generatedAt": timestamp(),
            "correlationId": correlation_id,
        },
    }))
}

/// POST /analyze-screens
pub(crate) async fn handle_analyze_screens(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let correlation_id = correlation_id();
    let result = async {
        let context = parse_context(payload)?;
        let screens = analyze_screens(state.client.as_ref(), &context)
            .await
            .map_err(|e| ApiError::AnalysisFailed(e.to_string()))?;
        Ok::<_, ApiError>(json!({
            "screens": screens,
            "meta": {
                "count": screens.len(),
                "generatedAt": timestamp(),
                "correlationId": correlation_id,
            },
        }))
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response_with(&correlation_id),
    }
}

/// POST /generate-single-mockup
pub(crate) async fn handle_single_mockup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let correlation_id = correlation_id();
    let result = async {
        let Json(body) = payload?;
        let screen = body
            .get("screen")
            .and_then(|s| normalize_screen(0, s))
            .ok_or_else(|| {
                ApiError::BadRequest("missing 'screen' object with a name or id".into())
            })?;
        let context = context_from(body)?;

        let mockup = generate_mockup(state.client.as_ref(), &context, screen)
            .await
            .map_err(|e| ApiError::GenerationFailed(e.to_string()))?;
        Ok::<_, ApiError>(json!({
            "mockup": mockup,
            "meta": {
                "generatedAt": timestamp(),
                "correlationId": correlation_id,
            },
        }))
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response_with(&correlation_id),
    }
}

fn parse_context(payload: Result<Json<Value>, JsonRejection>) -> Result<MockupContext, ApiError> {
    let Json(body) = payload?;
    context_from(body)
}

fn context_from(body: Value) -> Result<MockupContext, ApiError> {
    let context: MockupContext = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid mockup request: {}", e)))?;
    let missing = context.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }
    Ok(context)
}
