//! Application state and environment configuration.

use std::sync::Arc;

use specifys_core::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use specifys_core::ModelClient;

/// Default number of concurrent per-screen mockup calls.
const DEFAULT_MOCKUP_CONCURRENCY: usize = 3;

/// Server configuration read once at startup.
#[derive(Debug, Clone)]
pub(crate) struct ServeConfig {
    /// Upstream secret from `OPENAI_API_KEY`. None when unset or empty.
    pub(crate) api_key: Option<String>,
    /// `SPECIFYS_MODEL`
    pub(crate) model: String,
    /// `SPECIFYS_OPENAI_BASE_URL`
    pub(crate) base_url: String,
    /// `SPECIFYS_MOCKUP_CONCURRENCY`
    pub(crate) mockup_concurrency: usize,
}

impl ServeConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty("OPENAI_API_KEY"),
            model: non_empty("SPECIFYS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty("SPECIFYS_OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            mockup_concurrency: non_empty("SPECIFYS_MOCKUP_CONCURRENCY")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MOCKUP_CONCURRENCY),
        }
    }
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Upstream generation client.
    pub(crate) client: Arc<dyn ModelClient>,
    /// False when no API key was configured; `/health` answers 500.
    pub(crate) api_key_configured: bool,
    /// Bound on concurrent per-screen mockup calls.
    pub(crate) mockup_concurrency: usize,
}

impl AppState {
    pub(crate) fn new(client: Arc<dyn ModelClient>, config: &ServeConfig) -> Self {
        Self {
            client,
            api_key_configured: config.api_key.is_some(),
            mockup_concurrency: config.mockup_concurrency,
        }
    }
}
