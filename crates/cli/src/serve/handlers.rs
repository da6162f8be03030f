//! Route handlers: generate, fix-diagram, health, selftest.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};

use specifys_core::diagram_fix::{accept_any, extract_corrected_code};
use specifys_core::{
    orchestrate, sanitize_tree, validate_document, DiagramFixRequest, Instructions, Issue,
    IssueKind, Orchestration, StageRequest, DEFAULT_LOCALE, FIX_DIAGRAM_STAGE,
};

use super::correlation_id;
use super::error::ApiError;
use super::state::AppState;

/// Upper bound on the `/health` upstream ping.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found(uri: Uri) -> Response {
    ApiError::NotFound(uri.path().to_string()).into_response_with(&correlation_id())
}

/// POST /generate
pub(crate) async fn handle_generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let correlation_id = correlation_id();
    match generate(&state, payload, &correlation_id).await {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(err) => err.into_response_with(&correlation_id),
    }
}

async fn generate(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
    correlation_id: &str,
) -> Result<Value, ApiError> {
    let Json(body) = payload?;

    let stage = required_str(&body, "stage")?;
    let locale = body
        .get("locale")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCALE);
    let prompt = body
        .get("prompt")
        .ok_or_else(|| ApiError::BadRequest("missing 'prompt' object".into()))?;
    let instructions = Instructions::new(
        required_str(prompt, "system")?,
        required_str(prompt, "developer")?,
        required_str(prompt, "user")?,
    );

    info!(correlation_id, stage, locale, "generate request");

    let request = StageRequest {
        stage: stage.to_string(),
        locale: locale.to_string(),
        instructions,
    };
    let outcome = orchestrate(state.client.as_ref(), &request, |doc| {
        validate_document(stage, doc)
    })
    .await
    .map_err(ApiError::Upstream)?;

    match outcome {
        Orchestration::Accepted { document, attempts } => {
            info!(correlation_id, stage, attempts, "stage document accepted");
            let mut document = sanitize_tree(&document);
            if let Some(obj) = document.as_object_mut() {
                obj.insert("correlationId".into(), Value::String(correlation_id.into()));
            }
            Ok(document)
        }
        Orchestration::Failed { issues, attempts } => {
            Err(ApiError::InvalidModelOutput { issues, attempts })
        }
    }
}

/// POST /fix-diagram
pub(crate) async fn handle_fix_diagram(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let correlation_id = correlation_id();
    match fix_diagram(&state, payload, &correlation_id).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response_with(&correlation_id),
    }
}

async fn fix_diagram(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
    correlation_id: &str,
) -> Result<Value, ApiError> {
    let Json(body) = payload?;
    let request: DiagramFixRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid fix-diagram request: {}", e)))?;
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    info!(correlation_id, diagram_id = %request.diagram_id, "fix-diagram request");

    let stage_request = StageRequest {
        stage: FIX_DIAGRAM_STAGE.to_string(),
        locale: DEFAULT_LOCALE.to_string(),
        instructions: request.instructions(),
    };
    let outcome = orchestrate(state.client.as_ref(), &stage_request, accept_any)
        .await
        .map_err(ApiError::Upstream)?;

    match outcome {
        Orchestration::Accepted { document, attempts } => match extract_corrected_code(&document)
        {
            Some(code) => Ok(json!({
                "diagramId": request.diagram_id,
                "correctedCode": code,
                "correlationId": correlation_id,
            })),
            None => Err(ApiError::InvalidModelOutput {
                issues: vec![Issue::new(
                    IssueKind::MissingField,
                    "correctedCode is required (string)",
                )],
                attempts,
            }),
        },
        Orchestration::Failed { issues, attempts } => {
            Err(ApiError::InvalidModelOutput { issues, attempts })
        }
    }
}

/// GET|POST /health
///
/// 200 whenever the gateway itself is up; the upstream state is reported in
/// the `openai` field. Only a missing API key is a gateway failure.
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    if !state.api_key_configured {
        return ApiError::Server("OPENAI_API_KEY is not configured".into())
            .into_response_with(&correlation_id());
    }

    let started = Instant::now();
    let probe = tokio::time::timeout(HEALTH_TIMEOUT, state.client.probe(Some(HEALTH_TIMEOUT))).await;
    let openai = match probe {
        Ok(Ok(answer)) if answer.is_success() => "ok",
        Ok(Ok(answer)) => {
            warn!(status = answer.status, "upstream health probe returned error status");
            "error"
        }
        Ok(Err(e)) => {
            warn!(error = %e, "upstream health probe failed");
            "error"
        }
        Err(_) => {
            warn!("upstream health probe timed out");
            "error"
        }
    };

    let response = json!({
        "cloudflare": "ok",
        "openai": openai,
        "responseTime": started.elapsed().as_millis() as u64,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /selftest
///
/// Passes the upstream status and body through untouched.
pub(crate) async fn handle_selftest(State(state): State<Arc<AppState>>) -> Response {
    match state.client.probe(None).await {
        Ok(answer) => {
            let status = StatusCode::from_u16(answer.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
                answer.body,
            )
                .into_response()
        }
        Err(e) => (StatusCode::OK, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

/// A required, non-empty string field of a JSON object. Whitespace counts as
/// content.
pub(crate) fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str, ApiError> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing '{}' field", field)))
}
