//! End-to-end tests for the authentication stage: missing credentials,
//! mock mode, and signed-bearer role resolution, exercised through the full
//! router rather than calling the middleware function directly.

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

const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars-long";

fn test_state(mode: AuthMode) -> AppState {
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
        auth_config: Arc::new(AuthConfig { mode, jwt_secret: JwtSecret::new(TEST_SECRET) }),
        budget_config: Arc::new(BudgetConfig { enforcement: BudgetEnforcement::None }),
        alert_config: Arc::new(AlertConfig { topic_arn: None }),
        clock: Arc::new(SystemClock),
        start_time: Instant::now(),
        version: "0.1.0-test",
        cors_origin: "*".to_string(),
    }
}

fn make_token(secret: &str, exp_offset_secs: i64, role: Option<&str>) -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        email: String,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    }
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &Claims {
            sub: "user-1".to_string(),
            email: "user@dynamo.works".to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
            role: role.map(|r| r.to_string()),
        },
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn get_admin_summary_request(bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/v1/budget/admin/summary").method("GET");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn token_mode_rejects_missing_credentials() {
    let app = dynamo_api::create_router(test_state(AuthMode::Token));
    let response = app.oneshot(get_admin_summary_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_mode_rejects_expired_token() {
    let app = dynamo_api::create_router(test_state(AuthMode::Token));
    let token = make_token(TEST_SECRET, -100, None);
    let response = app.oneshot(get_admin_summary_request(Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_mode_rejects_wrong_secret() {
    let app = dynamo_api::create_router(test_state(AuthMode::Token));
    let token = make_token("a-completely-different-secret-value", 300, Some("admin"));
    let response = app.oneshot(get_admin_summary_request(Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_role_is_forbidden_from_admin_summary() {
    let app = dynamo_api::create_router(test_state(AuthMode::Token));
    let token = make_token(TEST_SECRET, 300, Some("engineer"));
    let response = app.oneshot(get_admin_summary_request(Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_role_reaches_the_handler() {
    let app = dynamo_api::create_router(test_state(AuthMode::Token));
    let token = make_token(TEST_SECRET, 300, Some("admin"));
    let response = app.oneshot(get_admin_summary_request(Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mock_mode_allows_access_without_any_credentials() {
    let app = dynamo_api::create_router(test_state(AuthMode::Mock));
    let mut request = Request::builder().uri("/v1/budget/admin/summary").method("GET");
    request = request.header("x-mock-user-role", "admin");
    let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
