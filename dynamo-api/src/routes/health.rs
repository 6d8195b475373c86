//! `GET /health`. Simplified from `caliber-api`'s 3-endpoint `ping`/`live`/`ready`
//! split down to a single status/version/uptime shape.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version,
        uptime: state.start_time.elapsed().as_secs(),
    })
}
