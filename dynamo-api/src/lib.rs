//! Dynamo API - authenticating, policy-enforcing reverse proxy in front of the
//! Anthropic Messages API.
//!
//! `create_router` is exposed so integration tests can build the full axum app
//! against a fixture `AppState` without going through `main`.

pub mod alert;
pub mod clock;
pub mod config;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod surface;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use middleware::{
    audit_setup_middleware, auth_middleware, budget_middleware, request_id_middleware,
    router_middleware, scan_middleware,
};
use state::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new().route("/health", get(routes::health::health));

    let proxy = Router::new()
        .route("/v1/chat/completions", post(routes::proxy::chat_completions))
        .route("/v1/messages", post(routes::proxy::messages))
        .layer(from_fn(audit_setup_middleware))
        .layer(from_fn(router_middleware))
        .layer(from_fn_with_state(state.clone(), budget_middleware))
        .layer(from_fn_with_state(state.clone(), scan_middleware));

    let admin = Router::new()
        .route("/v1/budget/:user_id", get(routes::budget::get_budget))
        .route("/v1/budget/admin/summary", get(routes::budget::admin_summary))
        .route(
            "/v1/admin/api-keys",
            post(routes::admin_keys::create_api_key).get(routes::admin_keys::list_api_keys),
        )
        .route("/v1/admin/api-keys/:id", delete(routes::admin_keys::revoke_api_key))
        .route("/v1/admin/api-keys/:id/rotate", post(routes::admin_keys::rotate_api_key));

    let authenticated = proxy
        .merge(admin)
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let cors = if state.cors_origin == "*" {
        CorsLayer::permissive()
    } else {
        match state.cors_origin.parse::<axum::http::HeaderValue>() {
            Ok(origin) => CorsLayer::new().allow_origin(origin),
            Err(_) => CorsLayer::permissive(),
        }
    };

    Router::new()
        .merge(public)
        .merge(authenticated)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
