//! Shared test doubles for the model client seam.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use specifys_core::{ChatRequest, ModelClient, ModelError, UpstreamError, UpstreamProbe};

/// Mock client that pops replies from a queue and records every request.
pub struct MockModelClient {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    pub captured: Mutex<Vec<ChatRequest>>,
}

impl MockModelClient {
    pub fn new(replies: Vec<Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ChatRequest {
        self.captured.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        self.captured.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Transport("mock queue exhausted".to_string())))
    }

    async fn probe(&self, _timeout: Option<Duration>) -> Result<UpstreamProbe, ModelError> {
        Ok(UpstreamProbe {
            status: 200,
            body: "{}".to_string(),
        })
    }
}

pub fn upstream(status: u16, body: &str) -> Result<String, ModelError> {
    Err(UpstreamError {
        status,
        body: body.to_string(),
    }
    .into())
}

pub fn reply(doc: Value) -> Result<String, ModelError> {
    Ok(doc.to_string())
}

/// An overview payload that satisfies every overview rule.
pub fn valid_overview() -> Value {
    json!({
        "ideaSummary": "A marketplace for home-cooked meals",
        "targetAudience": {"primary": "busy professionals"},
        "valueProposition": "Real food from real neighbours",
        "coreFeaturesOverview": ["browse cooks", "order meals"],
        "userJourneySummary": "Sign up, browse, order, review",
    })
}
