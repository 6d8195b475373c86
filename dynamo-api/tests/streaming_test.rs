//! End-to-end test for the SSE streaming path, covering the chat-completion
//! surface's chunked reshaping and `[DONE]` terminator.

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
        auth_config: Arc::new(AuthConfig { mode: AuthMode::Mock, jwt_secret: JwtSecret::new("integration-test-secret-at-least-32-chars-long") }),
        budget_config: Arc::new(BudgetConfig { enforcement: BudgetEnforcement::None }),
        alert_config: Arc::new(AlertConfig { topic_arn: None }),
        clock: Arc::new(SystemClock),
        start_time: Instant::now(),
        version: "0.1.0-test",
        cors_origin: "*".to_string(),
    }
}

const SSE_BODY: &str = concat!(
    "event: message_start\n",
    "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"model\":\"claude-sonnet-4-20250514\",\"usage\":{\"input_tokens\":3,\"output_tokens\":0}}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"hi\"}}\n\n",
    "event: message_delta\n",
    "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":2}}\n\n",
    "event: message_stop\n",
    "data: {\"type\":\"message_stop\"}\n\n",
);

#[tokio::test]
async fn chat_completion_stream_emits_chunks_and_a_done_marker() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(SSE_BODY, "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let app = dynamo_api::create_router(test_state(mock_server.uri()));
    let payload = serde_json::json!({
        "model": "claude-sonnet-4-20250514",
        "messages": [{"role": "user", "content": "hello"}],
        "max_tokens": 100,
        "stream": true,
    });
    let request = Request::builder()
        .uri("/v1/chat/completions")
        .method("POST")
        .header("content-type", "application/json")
        .header("x-mock-user-role", "admin")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap().to_str().unwrap(),
        "text/event-stream"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("chat.completion.chunk"));
    assert!(text.contains("[DONE]"));
}
