//! Budget enforcer stage.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use dynamo_core::budget::{next_reset_date, BudgetStatus};
use dynamo_core::{AuthContext, DynamoError, RoleName};
use dynamo_storage::DbClient;

use crate::config::{BudgetConfig, BudgetEnforcement};

/// Usage, limit, and reset date for a block/warning message - the three facts a
/// caller needs to know when they can send requests again.
fn budget_detail(status: &BudgetStatus) -> String {
    let limit = status
        .monthly_limit
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unlimited".to_string());
    format!(
        "Usage at {}% of monthly limit ({} of {} tokens used, resets {})",
        status.percent_used,
        status.current_usage,
        limit,
        next_reset_date(status.period_start)
    )
}

pub async fn budget_middleware(
    State(db): State<DbClient>,
    State(budget_config): State<Arc<BudgetConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, DynamoError> {
    let auth = request.extensions().get::<AuthContext>().cloned();

    let Some(auth) = auth else {
        return Ok(next.run(request).await);
    };
    if auth.role == RoleName::Admin || budget_config.enforcement == BudgetEnforcement::None {
        return Ok(next.run(request).await);
    }
    let Some(user_id) = auth.user_id.as_deref() else {
        return Ok(next.run(request).await);
    };
    if !db.is_configured() {
        return Ok(next.run(request).await);
    }

    let status = match dynamo_storage::get_user_budget(&db, user_id, auth.role).await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user_id, "budget lookup failed, proceeding without enforcement");
            return Ok(next.run(request).await);
        }
    };

    if status.exceeded {
        let detail = budget_detail(&status);
        if budget_config.enforcement == BudgetEnforcement::Hard {
            return Err(DynamoError::budget_exceeded(detail));
        }
        let mut response = next.run(request).await;
        insert_warning_header(&mut response, &detail);
        return Ok(response);
    }

    if status.warning {
        let detail = budget_detail(&status);
        let mut response = next.run(request).await;
        insert_warning_header(&mut response, &detail);
        return Ok(response);
    }

    Ok(next.run(request).await)
}

fn insert_warning_header(response: &mut Response, detail: &str) {
    if let Ok(value) = HeaderValue::from_str(detail) {
        response.headers_mut().insert("x-budget-warning", value);
    }
}
