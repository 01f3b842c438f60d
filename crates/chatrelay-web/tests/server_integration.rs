//! Integration tests for the chatrelay-web server.
//!
//! These tests start a mock chat-completions provider and a real relay
//! server, both on random ports, and exercise the REST and GraphQL endpoints.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chatrelay::ChatClient;
use chatrelay::api::RetryConfig;
use chatrelay_web::{ChatDefaults, ChatService, WebConfig, spawn_web};
use serde_json::{Value, json};

// ── Mock provider ────────────────────────────────────────────────────

/// OpenAI-compatible stand-in. Fails the first `failures_left` calls with
/// `fail_status`, then echoes the last message back.
#[derive(Clone)]
struct MockProvider {
    received: Arc<Mutex<Vec<Value>>>,
    failures_left: Arc<AtomicUsize>,
    fail_status: StatusCode,
}

impl MockProvider {
    fn ok() -> Self {
        Self::failing(StatusCode::OK, 0)
    }

    fn failing(fail_status: StatusCode, times: usize) -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
            failures_left: Arc::new(AtomicUsize::new(times)),
            fail_status,
        }
    }

    fn requests(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

async fn completions(
    State(mock): State<MockProvider>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.received.lock().unwrap().push(body.clone());

    let should_fail = mock
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if should_fail {
        return (
            mock.fail_status,
            Json(json!({"error": {"message": "mock failure"}})),
        );
    }

    let messages = body["messages"].as_array().cloned().unwrap_or_default();
    let last = messages
        .last()
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    let n = messages.len();

    (
        StatusCode::OK,
        Json(json!({
            "id": "chatcmpl-mock",
            "model": body["model"],
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": format!("echo: {last}")},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": n, "completion_tokens": 2, "total_tokens": n + 2}
        })),
    )
}

async fn spawn_mock(mock: MockProvider) -> String {
    let router = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1")
}

/// Helper: spawn a relay on port 0 in front of `mock`.
async fn spawn_relay(mock: MockProvider, retry: RetryConfig, cors_origins: Vec<String>) -> String {
    let provider_url = spawn_mock(mock).await;
    let client = ChatClient::with_base_url("test-key", provider_url).unwrap();
    let service = ChatService::new(client, ChatDefaults::default(), retry);

    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], 0).into(),
        cors_origins,
    };
    let addr = spawn_web(Arc::new(service), config).await.unwrap();
    format!("http://{addr}")
}

async fn spawn_default(mock: MockProvider) -> String {
    spawn_relay(mock, RetryConfig::disabled(), Vec::new()).await
}

async fn post_json(url: String, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap()
}

fn long_history(pairs: usize, chars: usize) -> Vec<Value> {
    (0..pairs)
        .flat_map(|i| {
            [
                json!({"role": "user", "content": format!("q{i} {}", "a".repeat(chars))}),
                json!({"role": "assistant", "content": format!("r{i} {}", "b".repeat(chars))}),
            ]
        })
        .collect()
}

// ── REST Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let base = spawn_default(MockProvider::ok()).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["default_model"], chatrelay::DEFAULT_MODEL);
    assert!(json["uptime_secs"].is_u64());
}

#[tokio::test]
async fn models_endpoint_lists_limits() {
    let base = spawn_default(MockProvider::ok()).await;

    let json: Value = reqwest::get(format!("{base}/api/models"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let models = json.as_array().unwrap();
    assert!(
        models
            .iter()
            .any(|m| m["id"] == "gpt-4" && m["context_window"] == 8192)
    );
}

#[tokio::test]
async fn rest_chat_relays_and_normalizes() {
    let mock = MockProvider::ok();
    let base = spawn_default(mock.clone()).await;

    let resp = post_json(format!("{base}/api/chat"), json!({"message": "Hello"})).await;
    assert_eq!(resp.status(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["content"], "echo: Hello");
    assert_eq!(json["model"], chatrelay::DEFAULT_MODEL);
    assert_eq!(json["finish_reason"], "stop");
    assert_eq!(json["trimmed_messages"], 0);
    assert_eq!(json["usage"]["total_tokens"], 4);
    assert!(json["request_id"].as_str().unwrap().starts_with("req-"));

    // The provider saw [system, user].
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let sent = requests[0]["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["role"], "system");
    assert_eq!(sent[0]["content"], chatrelay::DEFAULT_SYSTEM_PROMPT);
    assert_eq!(sent[1], json!({"role": "user", "content": "Hello"}));
}

#[tokio::test]
async fn rest_chat_forwards_overrides() {
    let mock = MockProvider::ok();
    let base = spawn_default(mock.clone()).await;

    let resp = post_json(
        format!("{base}/api/chat"),
        json!({
            "message": "Hi",
            "model": "gpt-4o",
            "system_prompt": "Answer in French.",
            "max_tokens": 64,
            "temperature": 0.5
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let sent = &mock.requests()[0];
    assert_eq!(sent["model"], "gpt-4o");
    assert_eq!(sent["max_tokens"], 64);
    assert_eq!(sent["temperature"], 0.5);
    assert_eq!(sent["messages"][0]["content"], "Answer in French.");
}

#[tokio::test]
async fn rest_chat_trims_long_history() {
    let mock = MockProvider::ok();
    let base = spawn_default(mock.clone()).await;

    // 20 pairs of ~1000 chars is ~10k tokens, far over gpt-3.5-turbo's 3277 budget.
    let history = long_history(20, 1000);
    let resp = post_json(
        format!("{base}/api/chat"),
        json!({"message": "latest question", "history": history, "model": "gpt-3.5-turbo"}),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let json: Value = resp.json().await.unwrap();
    let trimmed = json["trimmed_messages"].as_u64().unwrap() as usize;
    assert!(trimmed > 0);

    let requests = mock.requests();
    let sent = requests[0]["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 2 + 40 - trimmed);
    assert_eq!(sent[0]["role"], "system");
    assert_eq!(sent.last().unwrap()["content"], "latest question");
    // Oldest turns went first: the earliest surviving history turn is the
    // one right after the dropped prefix.
    assert_eq!(sent[1], history[trimmed]);
}

#[tokio::test]
async fn rest_chat_large_window_keeps_history() {
    let mock = MockProvider::ok();
    let base = spawn_default(mock.clone()).await;

    let history = long_history(20, 1000);
    let resp = post_json(
        format!("{base}/api/chat"),
        json!({"message": "latest", "history": history, "model": "gpt-4o"}),
    )
    .await;
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["trimmed_messages"], 0);
    assert_eq!(mock.requests()[0]["messages"].as_array().unwrap().len(), 42);
}

#[tokio::test]
async fn rest_chat_rejects_empty_message() {
    let mock = MockProvider::ok();
    let base = spawn_default(mock.clone()).await;

    let resp = post_json(format!("{base}/api/chat"), json!({"message": "  "})).await;
    assert_eq!(resp.status(), 400);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "BAD_USER_INPUT");
    assert!(json["error"].as_str().unwrap().contains("must not be empty"));
    assert!(mock.requests().is_empty(), "provider must not be called");
}

#[tokio::test]
async fn rest_chat_malformed_body_gets_json_error() {
    let mock = MockProvider::ok();
    let base = spawn_default(mock.clone()).await;

    for body in [
        json!({"history": []}),
        json!({"message": "hi", "history": [{"role": "tool", "content": "x"}]}),
    ] {
        let resp = post_json(format!("{base}/api/chat"), body.clone()).await;
        assert_eq!(resp.status(), 400, "body: {body}");
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "BAD_USER_INPUT");
        assert_eq!(json["status"], 400);
        assert!(json["error"].as_str().unwrap().starts_with("Invalid request"));
    }

    let client = reqwest::Client::new();
    let not_json = client
        .post(format!("{base}/api/chat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status(), 400);
    let json: Value = not_json.json().await.unwrap();
    assert_eq!(json["code"], "BAD_USER_INPUT");

    let no_content_type = client
        .post(format!("{base}/api/chat"))
        .body(r#"{"message":"hi"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(no_content_type.status(), 400);
    let json: Value = no_content_type.json().await.unwrap();
    assert_eq!(json["code"], "BAD_USER_INPUT");

    assert!(mock.requests().is_empty(), "provider must not be called");
}

#[tokio::test]
async fn provider_rate_limit_maps_to_429() {
    let base = spawn_default(MockProvider::failing(StatusCode::TOO_MANY_REQUESTS, usize::MAX)).await;

    let resp = post_json(format!("{base}/api/chat"), json!({"message": "Hi"})).await;
    assert_eq!(resp.status(), 429);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Rate limit exceeded; please retry later");
    assert_eq!(json["status"], 429);
}

#[tokio::test]
async fn provider_auth_failure_maps_to_502() {
    let base = spawn_default(MockProvider::failing(StatusCode::UNAUTHORIZED, usize::MAX)).await;

    let resp = post_json(format!("{base}/api/chat"), json!({"message": "Hi"})).await;
    assert_eq!(resp.status(), 502);

    let json: Value = resp.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let mock = MockProvider::failing(StatusCode::SERVICE_UNAVAILABLE, 1);
    let retry = RetryConfig {
        base_delay: Duration::from_millis(1),
        jitter: false,
        ..RetryConfig::with_retries(2)
    };
    let base = spawn_relay(mock.clone(), retry, Vec::new()).await;

    let resp = post_json(format!("{base}/api/chat"), json!({"message": "Hi"})).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let mock = MockProvider::failing(StatusCode::BAD_REQUEST, usize::MAX);
    let retry = RetryConfig {
        base_delay: Duration::from_millis(1),
        ..RetryConfig::with_retries(3)
    };
    let base = spawn_relay(mock.clone(), retry, Vec::new()).await;

    let resp = post_json(format!("{base}/api/chat"), json!({"message": "Hi"})).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(mock.requests().len(), 1);
}

// ── GraphQL Tests ────────────────────────────────────────────────────

const CHAT_MUTATION: &str = "mutation Chat($input: ChatInput!) { \
    chat(input: $input) { content model trimmedMessages requestId usage { totalTokens } } }";

#[tokio::test]
async fn graphql_chat_mutation() {
    let mock = MockProvider::ok();
    let base = spawn_default(mock.clone()).await;

    let resp = post_json(
        format!("{base}/graphql"),
        json!({
            "query": CHAT_MUTATION,
            "variables": {"input": {
                "message": "Hi there",
                "history": [
                    {"role": "USER", "content": "before"},
                    {"role": "ASSISTANT", "content": "reply"}
                ]
            }}
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let json: Value = resp.json().await.unwrap();
    assert!(json.get("errors").is_none(), "{json}");
    let chat = &json["data"]["chat"];
    assert_eq!(chat["content"], "echo: Hi there");
    assert_eq!(chat["trimmedMessages"], 0);
    assert_eq!(chat["usage"]["totalTokens"], 6);

    let sent = mock.requests()[0]["messages"].as_array().unwrap().clone();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[1], json!({"role": "user", "content": "before"}));
    assert_eq!(sent[2], json!({"role": "assistant", "content": "reply"}));
}

#[tokio::test]
async fn graphql_health_and_models() {
    let base = spawn_default(MockProvider::ok()).await;

    let resp = post_json(
        format!("{base}/graphql"),
        json!({"query": "{ health { status version } models { id contextWindow } }"}),
    )
    .await;
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["health"]["status"], "ok");
    assert!(!json["data"]["models"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn graphql_provider_error_has_extensions() {
    let base = spawn_default(MockProvider::failing(StatusCode::TOO_MANY_REQUESTS, usize::MAX)).await;

    let resp = post_json(
        format!("{base}/graphql"),
        json!({"query": CHAT_MUTATION, "variables": {"input": {"message": "Hi"}}}),
    )
    .await;
    let json: Value = resp.json().await.unwrap();
    let err = &json["errors"][0];
    assert_eq!(err["message"], "Rate limit exceeded; please retry later");
    assert_eq!(err["extensions"]["code"], "RATE_LIMITED");
    assert_eq!(err["extensions"]["status"], 429);
}

#[tokio::test]
async fn graphiql_page_served() {
    let base = spawn_default(MockProvider::ok()).await;

    let resp = reqwest::get(format!("{base}/graphql")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(text.to_lowercase().contains("graphiql"));
}

// ── CORS Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn cors_preflight_allows_any_origin_by_default() {
    let base = spawn_default(MockProvider::ok()).await;

    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/api/chat"))
        .header("Origin", "http://frontend.test")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()["access-control-allow-origin"].to_str().unwrap(),
        "*"
    );
}

#[tokio::test]
async fn cors_restricted_to_configured_origins() {
    let base = spawn_relay(
        MockProvider::ok(),
        RetryConfig::disabled(),
        vec!["http://allowed.test".to_string()],
    )
    .await;
    let client = reqwest::Client::new();

    let allowed = client
        .get(format!("{base}/health"))
        .header("Origin", "http://allowed.test")
        .send()
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"]
            .to_str()
            .unwrap(),
        "http://allowed.test"
    );

    let denied = client
        .get(format!("{base}/health"))
        .header("Origin", "http://evil.test")
        .send()
        .await
        .unwrap();
    assert!(
        denied
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}
