//! Token-usage ledger and materialized budget counter.
//!
//! New typed SQL: a single transaction inserting a usage row and then upserting the
//! monthly counter via `ON CONFLICT`, using the same scoped-transaction idiom as
//! `db.rs`'s other writes.

use chrono::{NaiveDate, Utc};
use dynamo_core::budget::{build_budget_status, current_period_start, BudgetStatus};
use dynamo_core::catalog::{monthly_budget, RoleName};

use crate::error::StorageError;
use crate::pool::DbClient;

/// Single transaction: inserts one `token_usage` row and upserts the period counter.
/// Callers treat failures as fire-and-forget (logged and swallowed); this function
/// itself returns the error so the caller can decide how to log it.
pub async fn record_usage(
    db: &DbClient,
    user_id: &str,
    user_email: &str,
    role: RoleName,
    model: &str,
    input_tokens: i64,
    output_tokens: i64,
    cost_estimate: f64,
    category: Option<&str>,
) -> Result<(), StorageError> {
    let period_start = current_period_start(Utc::now());
    let total = input_tokens + output_tokens;
    let limit = monthly_budget(role).map(|l| l as i64);

    let mut client = db.get().await?;
    let txn = client.transaction().await?;

    txn.execute(
        "INSERT INTO token_usage (user_id, user_email, model, input_tokens, output_tokens, cost_estimate, request_category) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
        &[&user_id, &user_email, &model, &input_tokens, &output_tokens, &cost_estimate, &category],
    )
    .await?;

    txn.execute(
        "INSERT INTO user_budgets (user_id, period_start, role, monthly_limit, current_usage, updated_at) \
         VALUES ($1, $2, $3, $4, $5, now()) \
         ON CONFLICT (user_id, period_start) \
         DO UPDATE SET current_usage = user_budgets.current_usage + EXCLUDED.current_usage, updated_at = now()",
        &[&user_id, &period_start, &role.as_str(), &limit, &total],
    )
    .await?;

    txn.commit().await?;
    Ok(())
}

/// Absent counter row reads as zero usage. The monthly limit always comes from the
/// static role catalog, not the materialized row (the row only tracks `current_usage`).
pub async fn get_user_budget(
    db: &DbClient,
    user_id: &str,
    role: RoleName,
) -> Result<BudgetStatus, StorageError> {
    let period_start = current_period_start(Utc::now());
    let client = db.get().await?;
    let row = client
        .query_opt(
            "SELECT current_usage FROM user_budgets WHERE user_id = $1 AND period_start = $2",
            &[&user_id, &period_start],
        )
        .await?;

    let current_usage: i64 = row.map(|r| r.get(0)).unwrap_or(0);
    Ok(build_budget_status(
        role,
        period_start,
        current_usage.max(0) as u64,
        monthly_budget(role),
    ))
}

/// Aggregate usage across every user for the current period (admin summary surface).
pub async fn budget_admin_summary(db: &DbClient) -> Result<Vec<(String, NaiveDate, i64)>, StorageError> {
    let period_start = current_period_start(Utc::now());
    let client = db.get().await?;
    let rows = client
        .query(
            "SELECT user_id, period_start, current_usage FROM user_budgets WHERE period_start = $1 ORDER BY current_usage DESC",
            &[&period_start],
        )
        .await?;
    Ok(rows
        .iter()
        .map(|r| (r.get(0), r.get(1), r.get(2)))
        .collect())
}
