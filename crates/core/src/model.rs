//! Model caller: one structured request to the generation API, parsed as JSON.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Caller-supplied instructions for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    pub system: String,
    pub developer: String,
    pub user: String,
}

impl Instructions {
    pub fn new(
        system: impl Into<String>,
        developer: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            developer: developer.into(),
            user: user.into(),
        }
    }

    /// Same system/developer instructions with a different user instruction.
    pub fn with_user(&self, user: impl Into<String>) -> Self {
        Self {
            system: self.system.clone(),
            developer: self.developer.clone(),
            user: user.into(),
        }
    }

    /// Fold developer instructions into the system instruction.
    ///
    /// The upstream API has no developer role, so the two are joined with a
    /// blank line. Sampling is fixed at temperature 0.
    pub fn to_chat_request(&self) -> ChatRequest {
        let system = match (self.system.trim(), self.developer.trim()) {
            (s, "") => s.to_string(),
            ("", d) => d.to_string(),
            (s, d) => format!("{}\n\n{}", s, d),
        };
        ChatRequest {
            system,
            user: self.user.clone(),
            temperature: 0.0,
        }
    }
}

/// The request actually sent upstream: one system and one user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Raw status and body returned by a diagnostic upstream probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamProbe {
    pub status: u16,
    pub body: String,
}

impl UpstreamProbe {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to the external generation API.
///
/// Implementations own the HTTP details; the caller owns prompt construction
/// and response parsing.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one chat request and return the completion text.
    ///
    /// A non-success upstream status must be reported as
    /// [`ModelError::Upstream`] carrying the status and raw body.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError>;

    /// Issue a minimal request to the upstream API and report its raw answer.
    async fn probe(&self, timeout: Option<Duration>) -> Result<UpstreamProbe, ModelError>;
}

/// A completion parsed as JSON, or the raw text when it would not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Json(Value),
    Unparseable(String),
}

impl ModelReply {
    pub fn into_json(self) -> Option<Value> {
        match self {
            ModelReply::Json(v) => Some(v),
            ModelReply::Unparseable(_) => None,
        }
    }
}

/// Run one upstream round-trip and parse the completion.
pub async fn call_model(
    client: &dyn ModelClient,
    instructions: &Instructions,
) -> Result<ModelReply, ModelError> {
    let request = instructions.to_chat_request();
    let text = client.complete(&request).await?;
    Ok(parse_reply(&text))
}

/// Parse completion text as JSON, retrying once without a Markdown fence.
pub fn parse_reply(text: &str) -> ModelReply {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ModelReply::Unparseable(String::new());
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return ModelReply::Json(value);
    }
    match serde_json::from_str(strip_code_fences(trimmed)) {
        Ok(value) => ModelReply::Json(value),
        Err(_) => ModelReply::Unparseable(text.to_string()),
    }
}

/// Strip a leading ```` ```json ```` / ```` ``` ```` fence and its closing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with("```") {
        // Skip the opening fence line (``` or ```json)
        let after_open = if let Some(nl) = text.find('\n') {
            &text[nl + 1..]
        } else {
            return text.trim_start_matches('`').trim();
        };
        if let Some(close) = after_open.rfind("```") {
            return after_open[..close].trim();
        }
        return after_open.trim();
    }
    text
}
