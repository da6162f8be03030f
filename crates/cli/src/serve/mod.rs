//! `specifys serve` -- HTTP JSON gateway in front of the generation API.
//!
//! Every generation request goes through the bounded generate/validate/repair
//! loop in `specifys-core`; this module only maps requests in and outcomes
//! out.
//!
//! Endpoints:
//! - POST /generate                - Generate one stage document
//! - POST /fix-diagram             - Repair a single Mermaid diagram
//! - POST /generate-mockups        - Analyze screens, then mock up each one
//! - POST /analyze-screens         - Screen analysis only
//! - POST /generate-single-mockup  - Mockup for one given screen
//! - GET|POST /health              - Gateway and upstream status
//! - GET  /selftest                - Raw upstream passthrough for debugging
//!
//! Every response carries CORS headers; any OPTIONS request answers 204. A
//! panicking handler answers 500 `SERVER_ERROR` with the usual envelope.

mod error;
mod handlers;
mod middleware;
mod mockups;
mod state;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Router};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use specifys_core::OpenAiClient;

use self::error::panic_response;
use self::handlers::{
    handle_fix_diagram, handle_generate, handle_health, handle_not_found, handle_selftest,
};
use self::middleware::cors_middleware;
use self::mockups::{handle_analyze_screens, handle_generate_mockups, handle_single_mockup};
use self::state::{AppState, ServeConfig};

/// Maximum request body size: 10 MB.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// A fresh 16-character lowercase hex id for cross-log tracing.
pub(crate) fn correlation_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Current UTC time as RFC 3339.
pub(crate) fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Build the application router around the given state.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", post(handle_generate))
        .route("/fix-diagram", post(handle_fix_diagram))
        .route("/generate-mockups", post(handle_generate_mockups))
        .route("/analyze-screens", post(handle_analyze_screens))
        .route("/generate-single-mockup", post(handle_single_mockup))
        .route("/health", get(handle_health).post(handle_health))
        .route("/selftest", get(handle_selftest))
        .fallback(handle_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_middleware::from_fn(cors_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port.
///
/// Configuration comes from the environment (see [`ServeConfig::from_env`]).
/// A missing `OPENAI_API_KEY` does not prevent startup; `/health` reports it.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServeConfig::from_env();

    if config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; generation requests will fail upstream");
    }
    info!(
        model = %config.model,
        base_url = %config.base_url,
        mockup_concurrency = config.mockup_concurrency,
        "upstream configured"
    );

    let client = OpenAiClient::new(config.api_key.clone().unwrap_or_default(), &config.model)
        .with_base_url(&config.base_url);
    let state = Arc::new(AppState::new(Arc::new(client), &config));

    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("specifys gateway listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler; running until killed");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
