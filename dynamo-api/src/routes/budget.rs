//! Budget surface.

use axum::{
    extract::{Path, Request, State},
    Json,
};
use dynamo_core::budget::BudgetStatus;
use dynamo_core::{AuthContext, DynamoError, RoleName};
use dynamo_storage::DbClient;

fn require_self_or_admin(auth: &AuthContext, user_id: &str) -> Result<(), DynamoError> {
    if auth.role == RoleName::Admin {
        return Ok(());
    }
    if auth.user_id.as_deref() == Some(user_id) {
        return Ok(());
    }
    Err(DynamoError::forbidden("you may only view your own budget"))
}

pub async fn get_budget(
    State(db): State<DbClient>,
    Path(user_id): Path<String>,
    request: Request,
) -> Result<Json<BudgetStatus>, DynamoError> {
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(DynamoError::auth_required)?;
    require_self_or_admin(&auth, &user_id)?;

    if !db.is_configured() {
        return Err(DynamoError::not_found("no budget data available"));
    }

    let role = dynamo_storage::get_user_role(&db, &user_id)
        .await
        .map_err(DynamoError::from)?
        .unwrap_or(RoleName::DEFAULT);
    let status = dynamo_storage::get_user_budget(&db, &user_id, role)
        .await
        .map_err(DynamoError::from)?;
    Ok(Json(status))
}

pub async fn admin_summary(
    State(db): State<DbClient>,
    request: Request,
) -> Result<Json<Vec<serde_json::Value>>, DynamoError> {
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(DynamoError::auth_required)?;
    if auth.role != RoleName::Admin {
        return Err(DynamoError::forbidden("admin only"));
    }

    if !db.is_configured() {
        return Ok(Json(Vec::new()));
    }

    let rows = dynamo_storage::budget_admin_summary(&db)
        .await
        .map_err(DynamoError::from)?;
    let summary = rows
        .into_iter()
        .map(|(user_id, period_start, current_usage)| {
            serde_json::json!({
                "userId": user_id,
                "periodStart": period_start,
                "currentUsage": current_usage,
            })
        })
        .collect();
    Ok(Json(summary))
}
