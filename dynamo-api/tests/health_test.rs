//! End-to-end smoke test for the public health endpoint.

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

fn test_state() -> AppState {
    let db = DbClient::from_config(&DbConfig { database_url: None, max_size: 1 }).unwrap();
    AppState {
        db,
        upstream: Arc::new(AnthropicClient::new("test-key", "http://127.0.0.1:0", 50)),
        upstream_config: Arc::new(UpstreamConfig {
            api_key: UpstreamApiKey::new("test-key"),
            default_model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            base_url: "http://127.0.0.1:0".to_string(),
        }),
        auth_config: Arc::new(AuthConfig {
            mode: AuthMode::Token,
            jwt_secret: JwtSecret::new("integration-test-secret-at-least-32-chars-long"),
        }),
        budget_config: Arc::new(BudgetConfig { enforcement: BudgetEnforcement::Soft }),
        alert_config: Arc::new(AlertConfig { topic_arn: None }),
        clock: Arc::new(SystemClock),
        start_time: Instant::now(),
        version: "0.1.0-test",
        cors_origin: "*".to_string(),
    }
}

#[tokio::test]
async fn health_reports_ok_without_auth() {
    let app = dynamo_api::create_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}
