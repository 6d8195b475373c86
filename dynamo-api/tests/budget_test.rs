//! End-to-end test for the budget enforcer stage: without a configured
//! database there is nothing to look up, so the stage must be a no-op even
//! under hard enforcement, rather than failing closed.

use axum::{
    body::Body,
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
        auth_config: Arc::new(AuthConfig { mode: AuthMode::Mock, jwt_secret: JwtSecret::new("integration-test-secret-at-least-32-chars-long") }),
        budget_config: Arc::new(BudgetConfig { enforcement: BudgetEnforcement::Hard }),
        alert_config: Arc::new(AlertConfig { topic_arn: None }),
        clock: Arc::new(SystemClock),
        start_time: Instant::now(),
        version: "0.1.0-test",
        cors_origin: "*".to_string(),
    }
}

#[tokio::test]
async fn hard_enforcement_without_a_database_does_not_block_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_01xyz",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "still reachable"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1},
        })))
        .mount(&mock_server)
        .await;

    let app = dynamo_api::create_router(test_state(mock_server.uri()));
    let payload = serde_json::json!({
        "model": "claude-sonnet-4-20250514",
        "messages": [{"role": "user", "content": "hi"}],
        "max_tokens": 50,
    });
    let request = Request::builder()
        .uri("/v1/chat/completions")
        .method("POST")
        .header("content-type", "application/json")
        .header("x-mock-user-role", "business")
        .header("x-user-id", "user-7")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-budget-warning").is_none());
}
