//! Audit-log persistence.
//!
//! Entry construction (`buildAuditEntry`, prompt extraction/hashing/preview) is pure
//! and lives in `dynamo-api`'s audit-setup stage; this module only does the
//! structured-log line plus the typed insert, both fire-and-forget from the
//! caller's perspective - log first, then store, swallowing store failures so an
//! audit-write hiccup never surfaces to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StorageError;
use crate::pool::DbClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
    Blocked,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Error => "error",
            AuditStatus::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub request_id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_estimate: f64,
    pub request_category: Option<String>,
    pub source: &'static str,
    pub prompt_hash: String,
    pub prompt_preview: String,
    pub response_preview: String,
    pub latency_ms: i64,
    pub status: AuditStatus,
}

/// Structured log line to stdout, plus insert into `audit_logs`. Any store failure
/// is logged and swallowed - the caller cannot fail because the client has already
/// been served.
pub async fn commit_audit_log(db: &DbClient, entry: &AuditEntry) {
    tracing::info!(
        request_id = %entry.request_id,
        user_id = entry.user_id.as_deref().unwrap_or(""),
        model = %entry.model,
        input_tokens = entry.input_tokens,
        output_tokens = entry.output_tokens,
        cost_estimate = entry.cost_estimate,
        status = entry.status.as_str(),
        latency_ms = entry.latency_ms,
        "audit log entry"
    );

    if !db.is_configured() {
        return;
    }

    if let Err(e) = insert_audit_row(db, entry).await {
        tracing::warn!(error = %e, request_id = %entry.request_id, "failed to persist audit log row");
    }
}

async fn insert_audit_row(db: &DbClient, entry: &AuditEntry) -> Result<(), StorageError> {
    let client = db.get().await?;
    client
        .execute(
            "INSERT INTO audit_logs \
             (request_id, user_id, user_email, timestamp, model, input_tokens, output_tokens, \
              cost_estimate, request_category, source, prompt_hash, prompt_preview, response_preview, \
              latency_ms, status) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
            &[
                &entry.request_id,
                &entry.user_id,
                &entry.user_email,
                &entry.timestamp,
                &entry.model,
                &entry.input_tokens,
                &entry.output_tokens,
                &entry.cost_estimate,
                &entry.request_category,
                &entry.source,
                &entry.prompt_hash,
                &entry.prompt_preview,
                &entry.response_preview,
                &entry.latency_ms,
                &entry.status.as_str(),
            ],
        )
        .await?;
    Ok(())
}
