//! End-to-end tests for the full request pipeline (model routing, proxy surfaces)
//! against a mocked upstream, covering both public surfaces and streaming.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use dynamo_api::clock::SystemClock;
use dynamo_api::config::{AlertConfig, AuthConfig, AuthMode, BudgetConfig, BudgetEnforcement, JwtSecret, UpstreamApiKey, UpstreamConfig};
use dynamo_api::state::AppState;
use dynamo_llm::AnthropicClient;
use dynamo_storage::{DbClient, DbConfig};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_state(base_url: String) -> AppState {
    let db = DbClient::from_config(&DbConfig { database_url: None, max_size: 1 }).unwrap();
    AppState {
        db,
        upstream: Arc::new(AnthropicClient::new("test-key", base_url.clone(), 50)),
        upstream_config: Arc::new(UpstreamConfig {
            api_key: UpstreamApiKey::new("test-key"),
            default_model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            base_url,
        }),
        auth_config: Arc::new(AuthConfig {
            mode: AuthMode::Mock,
            jwt_secret: JwtSecret::new("integration-test-secret-at-least-32-chars-long"),
        }),
        budget_config: Arc::new(BudgetConfig { enforcement: BudgetEnforcement::None }),
        alert_config: Arc::new(AlertConfig { topic_arn: None }),
        clock: Arc::new(SystemClock),
        start_time: Instant::now(),
        version: "0.1.0-test",
        cors_origin: "*".to_string(),
    }
}

fn request(uri: &str, role: &str, model: &str) -> Request<Body> {
    let payload = serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": "hello there"}],
        "max_tokens": 100,
    });
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .header("x-mock-user-role", role)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn chat_completion_surface_reshapes_the_upstream_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_01abc",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "hi back"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 5, "output_tokens": 3},
        })))
        .mount(&mock_server)
        .await;

    let app = dynamo_api::create_router(test_state(mock_server.uri()));
    let response = app
        .oneshot(request("/v1/chat/completions", "admin", "claude-sonnet-4-20250514"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["object"], "chat.completion");
    assert_eq!(json["choices"][0]["message"]["content"], "hi back");
    assert_eq!(json["choices"][0]["finish_reason"], "stop");
    assert_eq!(json["usage"]["total_tokens"], 8);
}

#[tokio::test]
async fn native_surface_passes_the_response_through_unreshaped() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_01def",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "native reply"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 2, "output_tokens": 4},
        })))
        .mount(&mock_server)
        .await;

    let app = dynamo_api::create_router(test_state(mock_server.uri()));
    let response = app
        .oneshot(request("/v1/messages", "admin", "claude-sonnet-4-20250514"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["content"][0]["text"], "native reply");
}

#[tokio::test]
async fn disallowed_model_is_downgraded_and_response_carries_the_header() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_01ghi",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "downgraded reply"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1},
        })))
        .mount(&mock_server)
        .await;

    let app = dynamo_api::create_router(test_state(mock_server.uri()));
    // business is not permitted opus; the router should silently downgrade to sonnet.
    let response = app
        .oneshot(request("/v1/chat/completions", "business", "claude-opus-4-20250514"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-model-downgraded").unwrap(), "true");
}
