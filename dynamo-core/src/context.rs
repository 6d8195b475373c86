//! Per-request, in-memory context.
//!
//! Lifetime = one request: created at ingress, discarded when the response is
//! closed. This is the principal vehicle for inter-stage data - it is passed
//! explicitly (via axum request extensions at the handler boundary, and by value
//! between pure functions) rather than read from ambient/global state.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::catalog::RoleName;
use crate::classifier::Category;
use crate::scanner::ScanResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
    Bearer,
    Mock,
}

/// Derived client class, from the request's user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Web,
    Cli,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Web => "web",
            Source::Cli => "cli",
        }
    }
}

/// Identity and role resolved by the authentication stage, consumed by every
/// later stage.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub display_name: Option<String>,
    pub role: RoleName,
    pub api_key_id: Option<String>,
    pub auth_method: AuthMethod,
}

/// Populated by the audit-setup stage before the upstream call; consumed by the
/// proxy handler after the call completes to build the final audit-log row.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub prompt_text: String,
    pub prompt_hash: String,
    pub prompt_preview: String,
    pub source: Source,
    pub category: Category,
}

/// The full per-request context threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub auth: Option<AuthContext>,
    pub start_time: Instant,
    pub audit: Option<AuditContext>,
    pub scan_result: Option<ScanResult>,
}

impl RequestContext {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            auth: None,
            start_time: Instant::now(),
            audit: None,
            scan_result: None,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }
}
