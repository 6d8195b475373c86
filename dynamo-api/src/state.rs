//! Shared application state, injected via axum's `State` extractor.
//!
//! Pared down from `caliber-api/src/state.rs`'s much larger `AppState` - this proxy
//! needs only a store handle, the upstream client, the loaded configs, and the boot
//! time for `/health`'s uptime field.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use dynamo_llm::AnthropicClient;
use dynamo_storage::DbClient;

use crate::clock::JwtClock;
use crate::config::{AlertConfig, AuthConfig, BudgetConfig, UpstreamConfig};

#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub upstream: Arc<AnthropicClient>,
    pub upstream_config: Arc<UpstreamConfig>,
    pub auth_config: Arc<AuthConfig>,
    pub budget_config: Arc<BudgetConfig>,
    pub alert_config: Arc<AlertConfig>,
    pub clock: Arc<dyn JwtClock>,
    pub start_time: Instant,
    pub version: &'static str,
    pub cors_origin: String,
}

impl FromRef<AppState> for DbClient {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<AnthropicClient> {
    fn from_ref(state: &AppState) -> Self {
        state.upstream.clone()
    }
}

impl FromRef<AppState> for Arc<AuthConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.auth_config.clone()
    }
}

impl FromRef<AppState> for Arc<BudgetConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.budget_config.clone()
    }
}

impl FromRef<AppState> for Arc<AlertConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.alert_config.clone()
    }
}

impl FromRef<AppState> for Arc<UpstreamConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.upstream_config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn JwtClock> {
    fn from_ref(state: &AppState) -> Self {
        state.clock.clone()
    }
}
