//! OpenAI chat-completions client.
//!
//! Uses `ureq` for HTTP inside `spawn_blocking`. Status errors are disabled on
//! the agent so a non-2xx answer keeps its body for [`UpstreamError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ModelError, UpstreamError};
use crate::model::{ChatRequest, ModelClient, UpstreamProbe};

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Reference [`ModelClient`] backed by the OpenAI chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client with an explicit API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different base URL (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": request.temperature,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        })
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .into()
}

/// Read status and body from a ureq response without treating status as error.
fn read_response(
    response: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<UpstreamProbe, ModelError> {
    let response = response.map_err(|e| ModelError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let mut body = response.into_body();
    let text = body
        .read_to_string()
        .map_err(|e| ModelError::Transport(format!("failed to read upstream body: {}", e)))?;
    Ok(UpstreamProbe { status, body: text })
}

/// Pull `choices[0].message.content` out of a successful completion body.
fn extract_content(body: &str) -> Result<String, ModelError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::Transport(format!("malformed completion body: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ModelError::EmptyContent)
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let api_key = self.api_key.clone();
        let body = self.request_body(request);

        let answer = tokio::task::spawn_blocking(move || {
            let response = agent(None)
                .post(&url)
                .header("authorization", &format!("Bearer {}", api_key))
                .header("content-type", "application/json")
                .send_json(&body);
            read_response(response)
        })
        .await
        .map_err(|e| ModelError::Internal(format!("task join error: {}", e)))??;

        if !answer.is_success() {
            return Err(UpstreamError {
                status: answer.status,
                body: answer.body,
            }
            .into());
        }
        extract_content(&answer.body)
    }

    async fn probe(&self, timeout: Option<Duration>) -> Result<UpstreamProbe, ModelError> {
        let url = format!("{}/v1/models", self.base_url);
        let api_key = self.api_key.clone();

        tokio::task::spawn_blocking(move || {
            let response = agent(timeout)
                .get(&url)
                .header("authorization", &format!("Bearer {}", api_key))
                .call();
            read_response(response)
        })
        .await
        .map_err(|e| ModelError::Internal(format!("task join error: {}", e)))?
    }
}
