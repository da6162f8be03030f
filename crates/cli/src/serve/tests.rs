//! In-process router tests driven through `tower::ServiceExt::oneshot`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use specifys_core::{ChatRequest, ModelClient, ModelError, UpstreamError, UpstreamProbe};

use super::router;
use super::state::{AppState, ServeConfig};

/// Mock client that pops completions from a queue and records every request.
struct MockModelClient {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    captured: Mutex<Vec<ChatRequest>>,
    probe_status: u16,
    probe_delay: Option<Duration>,
    probe_panics: bool,
}

impl MockModelClient {
    fn new(replies: Vec<Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            captured: Mutex::new(Vec::new()),
            probe_status: 200,
            probe_delay: None,
            probe_panics: false,
        }
    }

    fn calls(&self) -> usize {
        self.captured.lock().unwrap().len()
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
        if self.probe_panics {
            panic!("models listing exploded");
        }
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(UpstreamProbe {
            status: self.probe_status,
            body: r#"{"object":"list","data":[]}"#.to_string(),
        })
    }
}

fn config(api_key: Option<&str>) -> ServeConfig {
    ServeConfig {
        api_key: api_key.map(str::to_string),
        model: "gpt-test".to_string(),
        base_url: "http://localhost:0".to_string(),
        mockup_concurrency: 2,
    }
}

fn app_with(client: Arc<MockModelClient>) -> Router {
    router(Arc::new(AppState::new(client, &config(Some("sk-test")))))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn reply(doc: Value) -> Result<String, ModelError> {
    Ok(doc.to_string())
}

fn overview_payload() -> Value {
    json!({
        "ideaSummary": "A marketplace for home-cooked meals",
        "targetAudience": {"primary": "busy professionals"},
        "valueProposition": "Real food from real neighbours",
        "coreFeaturesOverview": ["browse cooks", "order meals"],
        "userJourneySummary": "Sign up, browse, order, review",
    })
}

fn generate_body(stage: &str) -> Value {
    json!({
        "stage": stage,
        "locale": "en-US",
        "prompt": {
            "system": "You write product specifications.",
            "developer": "Return JSON only.",
            "user": "Idea: a meal marketplace",
        },
    })
}

fn mockup_body() -> Value {
    json!({
        "overview": {"ideaSummary": "Habit tracker"},
        "design": {"visualStyleGuide": {"primary": "#123456"}},
    })
}

// ── /generate ────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_repairs_incomplete_overview() {
    let mut incomplete = overview_payload();
    incomplete
        .as_object_mut()
        .unwrap()
        .remove("userJourneySummary");
    let client = Arc::new(MockModelClient::new(vec![
        reply(json!({"overview": incomplete})),
        reply(json!({"overview": overview_payload()})),
    ]));

    let (status, body) = send(
        app_with(client.clone()),
        post_json("/generate", &generate_body("overview")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(client.calls(), 2);
    assert_eq!(body["meta"]["stage"], "overview");
    assert_eq!(body["meta"]["version"], "1.0.0");
    assert_eq!(
        body["overview"]["userJourneySummary"],
        "Sign up, browse, order, review"
    );
    let cid = body["correlationId"].as_str().unwrap();
    assert_eq!(cid.len(), 16);
    assert!(cid
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
}

#[tokio::test]
async fn generate_sanitizes_diagram_labels() {
    let long_label = "L".repeat(80);
    let client = Arc::new(MockModelClient::new(vec![reply(json!({
        "overview": overview_payload(),
        "flow": {"nodes": [{"id": "Start Here!", "label": long_label}], "edges": []},
    }))]));

    let (status, body) = send(
        app_with(client),
        post_json("/generate", &generate_body("overview")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flow"]["nodes"][0]["id"], "start-here");
    let label = body["flow"]["nodes"][0]["label"].as_str().unwrap();
    assert_eq!(label.chars().count(), 60);
    assert!(label.ends_with('…'));
}

#[tokio::test]
async fn generate_reports_issues_after_three_attempts() {
    let client = Arc::new(MockModelClient::new(vec![
        reply(json!({"overview": {}})),
        reply(json!({"overview": {}})),
        reply(json!({"overview": {}})),
    ]));

    let (status, body) = send(
        app_with(client.clone()),
        post_json("/generate", &generate_body("overview")),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(client.calls(), 3);
    assert_eq!(body["error"]["code"], "INVALID_MODEL_OUTPUT");
    let issues = body["error"]["issues"].as_array().unwrap();
    assert!(issues.contains(&json!("overview.ideaSummary is required (string)")));
    assert!(body["correlationId"].is_string());
}

#[tokio::test]
async fn generate_missing_prompt_field_is_bad_request() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let mut body = generate_body("overview");
    body["prompt"].as_object_mut().unwrap().remove("developer");

    let (status, json) = send(app_with(client.clone()), post_json("/generate", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("developer"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn generate_accepts_whitespace_prompt_field() {
    let client = Arc::new(MockModelClient::new(vec![reply(
        json!({"overview": overview_payload()}),
    )]));
    let mut body = generate_body("overview");
    body["prompt"]["developer"] = json!(" ");

    let (status, json) = send(app_with(client.clone()), post_json("/generate", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["stage"], "overview");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn generate_empty_prompt_field_is_bad_request() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let mut body = generate_body("overview");
    body["prompt"]["user"] = json!("");

    let (status, json) = send(app_with(client.clone()), post_json("/generate", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("user"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn generate_malformed_json_is_bad_request() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let req = Request::builder()
        .method("POST")
        .uri("/generate")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, json) = send(app_with(client), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn generate_upstream_error_is_bad_gateway() {
    let client = Arc::new(MockModelClient::new(vec![Err(UpstreamError {
        status: 401,
        body: "invalid key".to_string(),
    }
    .into())]));

    let (status, json) = send(
        app_with(client.clone()),
        post_json("/generate", &generate_body("overview")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(client.calls(), 1);
    assert_eq!(json["error"]["code"], "OPENAI_UPSTREAM_ERROR");
}

// ── /fix-diagram ─────────────────────────────────────────────────────

fn fix_body() -> Value {
    json!({
        "diagramId": "user_flow",
        "diagramType": "flowchart",
        "brokenCode": "graph TD; A[Start --> B",
    })
}

#[tokio::test]
async fn fix_diagram_upstream_429_is_bad_gateway() {
    let client = Arc::new(MockModelClient::new(vec![Err(UpstreamError {
        status: 429,
        body: r#"{"error":"rate_limit_exceeded"}"#.to_string(),
    }
    .into())]));

    let (status, json) = send(app_with(client.clone()), post_json("/fix-diagram", &fix_body())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(client.calls(), 1);
    assert_eq!(json["error"]["code"], "OPENAI_UPSTREAM_ERROR");
    assert!(json["error"]["message"].as_str().unwrap().contains("429"));
}

#[tokio::test]
async fn fix_diagram_returns_corrected_code() {
    let client = Arc::new(MockModelClient::new(vec![reply(json!({
        "correctedCode": "```mermaid\ngraph TD\nA[Start] --> B\n```"
    }))]));

    let (status, json) = send(app_with(client), post_json("/fix-diagram", &fix_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["diagramId"], "user_flow");
    assert_eq!(json["correctedCode"], "graph TD\nA[Start] --> B");
    assert!(json["correlationId"].is_string());
}

#[tokio::test]
async fn fix_diagram_missing_code_is_bad_request() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let mut body = fix_body();
    body.as_object_mut().unwrap().remove("brokenCode");

    let (status, json) = send(app_with(client), post_json("/fix-diagram", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

// ── Mockups ──────────────────────────────────────────────────────────

#[tokio::test]
async fn mockup_batch_keeps_successful_screens() {
    let client = Arc::new(MockModelClient::new(vec![
        reply(json!({"screens": [
            {"id": "home", "name": "Home", "order": 1},
            {"id": "stats", "name": "Stats", "order": 2},
        ]})),
        reply(json!({"html": "<html><body>screen</body></html>"})),
        Err(ModelError::EmptyContent),
    ]));

    let (status, json) = send(
        app_with(client.clone()),
        post_json("/generate-mockups", &mockup_body()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(client.calls(), 3);
    assert_eq!(json["mockups"].as_array().unwrap().len(), 1);
    assert_eq!(json["meta"]["count"], 1);
    assert_eq!(json["meta"]["screensAnalyzed"], 2);
    assert!(json["meta"]["generatedAt"].is_string());
}

#[tokio::test]
async fn mockup_batch_analysis_failure() {
    let client = Arc::new(MockModelClient::new(vec![reply(json!({"screens": "none"}))]));

    let (status, json) = send(app_with(client), post_json("/generate-mockups", &mockup_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "ANALYSIS_FAILED");
}

#[tokio::test]
async fn mockup_request_requires_design() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let body = json!({"overview": {"ideaSummary": "x"}, "design": {}});

    let (status, json) = send(app_with(client), post_json("/analyze-screens", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("design"));
}

#[tokio::test]
async fn analyze_screens_returns_list() {
    let client = Arc::new(MockModelClient::new(vec![reply(json!({"screens": [
        {"name": "Home"}, {"name": "Profile"}, {"name": "Settings"},
    ]}))]));

    let (status, json) = send(app_with(client), post_json("/analyze-screens", &mockup_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["count"], 3);
    assert_eq!(json["screens"][2]["id"], "settings");
}

#[tokio::test]
async fn single_mockup_failure_is_generation_failed() {
    let client = Arc::new(MockModelClient::new(vec![reply(json!({"text": "no markup"}))]));
    let mut body = mockup_body();
    body["screen"] = json!({"id": "home", "name": "Home"});

    let (status, json) = send(app_with(client), post_json("/generate-single-mockup", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "GENERATION_FAILED");
}

#[tokio::test]
async fn single_mockup_success() {
    let client = Arc::new(MockModelClient::new(vec![Ok(
        "```html\n<!DOCTYPE html><html><body>Home</body></html>\n```".to_string(),
    )]));
    let mut body = mockup_body();
    body["screen"] = json!({"id": "home", "name": "Home", "deviceType": "mobile"});
    body["useMockData"] = json!(true);

    let (status, json) = send(app_with(client), post_json("/generate-single-mockup", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mockup"]["id"], "home");
    assert_eq!(json["mockup"]["deviceType"], "mobile");
    assert!(json["mockup"]["html"]
        .as_str()
        .unwrap()
        .starts_with("<!DOCTYPE html>"));
}

// ── Health, selftest, fallback, CORS ─────────────────────────────────

#[tokio::test]
async fn health_reports_upstream_status() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(app_with(client), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cloudflare"], "ok");
    assert_eq!(json["openai"], "ok");
    assert!(json["responseTime"].is_u64());
}

#[tokio::test]
async fn health_stays_200_when_upstream_fails() {
    let mut client = MockModelClient::new(vec![]);
    client.probe_status = 503;
    let req = Request::builder()
        .method("POST")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(app_with(Arc::new(client)), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["openai"], "error");
}

#[tokio::test(start_paused = true)]
async fn health_upstream_timeout_is_reported_not_fatal() {
    let mut client = MockModelClient::new(vec![]);
    client.probe_delay = Some(Duration::from_secs(30));
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(app_with(Arc::new(client)), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cloudflare"], "ok");
    assert_eq!(json["openai"], "error");
}

#[tokio::test]
async fn handler_panic_becomes_server_error_envelope() {
    let mut client = MockModelClient::new(vec![]);
    client.probe_panics = true;
    let req = Request::builder()
        .uri("/selftest")
        .header("origin", "https://specifys-ai.com")
        .body(Body::empty())
        .unwrap();

    let res = app_with(Arc::new(client)).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.headers()["access-control-allow-origin"],
        "https://specifys-ai.com"
    );
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"]["code"], "SERVER_ERROR");
    assert_eq!(json["correlationId"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn health_without_api_key_is_server_error() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let app = router(Arc::new(AppState::new(client, &config(None))));
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(app, req).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "SERVER_ERROR");
}

#[tokio::test]
async fn selftest_passes_upstream_through() {
    let mut client = MockModelClient::new(vec![]);
    client.probe_status = 401;
    let req = Request::builder()
        .uri("/selftest")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(app_with(Arc::new(client)), req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["object"], "list");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let req = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(app_with(client), req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert!(json["correlationId"].is_string());
}

#[tokio::test]
async fn options_is_no_content_with_cors() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/generate")
        .header("origin", "https://specifys-ai.com")
        .body(Body::empty())
        .unwrap();

    let res = app_with(client).oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let headers = res.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://specifys-ai.com"
    );
    assert_eq!(headers["vary"], "Origin");
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn cors_defaults_to_wildcard() {
    let client = Arc::new(MockModelClient::new(vec![]));
    let req = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .unwrap();

    let res = app_with(client).oneshot(req).await.unwrap();

    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}
