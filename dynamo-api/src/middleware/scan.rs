//! Sensitive-data stage.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use dynamo_core::{build_block_message, classify, scan_text, AuthContext, DynamoError};
use dynamo_storage::{AuditEntry, AuditStatus, DbClient};
use sha2::{Digest, Sha256};

use crate::alert::{build_alert, spawn_publish_alert, AlertContext};
use crate::config::AlertConfig;
use crate::middleware::audit_setup::{build_preview, detect_source};
use crate::middleware::body::read_json_body;
use crate::middleware::request_id::RequestId;
use crate::surface::extract_prompt_text;

pub async fn scan_middleware(
    State(alert_config): State<Arc<AlertConfig>>,
    State(db): State<DbClient>,
    request: Request,
    next: Next,
) -> Result<Response, DynamoError> {
    let started = std::time::Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.to_string())
        .unwrap_or_default();
    let auth = request.extensions().get::<AuthContext>().cloned();
    let route = request.uri().path().to_string();
    let source = detect_source(&request);

    let (request, body) = read_json_body(request).await?;
    let prompt_text = extract_prompt_text(&body);
    let result = scan_text(&prompt_text);

    let ctx = AlertContext {
        request_id: request_id.clone(),
        user_id: auth.as_ref().and_then(|a| a.user_id.clone()),
        user_email: auth.as_ref().and_then(|a| a.user_email.clone()),
        route: route.clone(),
    };

    if result.has_high_severity {
        spawn_publish_alert(alert_config, build_alert(&result.findings, ctx));
        let classification = classify(&prompt_text, source);
        let prompt_hash = {
            let mut hasher = Sha256::new();
            hasher.update(prompt_text.as_bytes());
            hex::encode(hasher.finalize())
        };
        let entry = AuditEntry {
            request_id,
            user_id: auth.as_ref().and_then(|a| a.user_id.clone()),
            user_email: auth.as_ref().and_then(|a| a.user_email.clone()),
            timestamp: chrono::Utc::now(),
            model: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            cost_estimate: 0.0,
            request_category: Some(classification.category.as_str().to_string()),
            source: source.as_str(),
            prompt_hash,
            prompt_preview: build_preview(&prompt_text),
            response_preview: String::new(),
            latency_ms: started.elapsed().as_millis() as i64,
            status: AuditStatus::Blocked,
        };
        tokio::spawn(async move {
            dynamo_storage::commit_audit_log(&db, &entry).await;
        });
        return Err(DynamoError::sensitive_data_blocked(build_block_message(&result)));
    }

    if result.has_medium_severity {
        let warning = format!(
            "Request contains potentially sensitive data ({} finding(s))",
            result.findings.len()
        );
        spawn_publish_alert(alert_config, build_alert(&result.findings, ctx));
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&warning) {
            response.headers_mut().insert("x-sensitive-data-warning", value);
        }
        return Ok(response);
    }

    Ok(next.run(request).await)
}
