//! API-key persistence.
//!
//! Format/hash/prefix derivation is pure (`dynamo_core::api_key`); this module only
//! does the typed SQL. `caliber-api/src/db.rs` calls a custom pgrx extension for
//! every write, which isn't available here, so these are genuine direct queries,
//! while keeping the same pool-acquisition shape.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dynamo_core::{derive_user_id, generate_raw_key, hash_key, key_prefix, RoleName};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::StorageError;
use crate::pool::DbClient;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub user_id: String,
    pub user_email: String,
    pub key_prefix: String,
    pub role: RoleName,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

const SELECT_COLUMNS: &str =
    "id, user_id, user_email, key_prefix, role, created_at, last_used_at, revoked_at, is_active";

fn row_to_record(row: &Row) -> ApiKeyRecord {
    let role_str: String = row.get("role");
    ApiKeyRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_email: row.get("user_email"),
        key_prefix: row.get("key_prefix"),
        role: RoleName::from_str(&role_str).expect("RoleName::from_str is infallible"),
        created_at: row.get("created_at"),
        last_used_at: row.get("last_used_at"),
        revoked_at: row.get("revoked_at"),
        is_active: row.get("is_active"),
    }
}

/// Inserts an active row, deriving `userId` from the email's localpart. Returns the
/// raw key exactly once - it is never stored.
pub async fn create_api_key(
    db: &DbClient,
    user_email: &str,
    role: RoleName,
) -> Result<(String, ApiKeyRecord), StorageError> {
    let raw = generate_raw_key();
    let hash = hash_key(&raw);
    let prefix = key_prefix(&raw);
    let user_id = derive_user_id(user_email);

    let client = db.get().await?;
    let row = client
        .query_one(
            &format!(
                "INSERT INTO api_keys (user_id, user_email, key_hash, key_prefix, role, is_active) \
                 VALUES ($1, $2, $3, $4, $5, true) RETURNING {SELECT_COLUMNS}"
            ),
            &[&user_id, &user_email, &hash, &prefix, &role.as_str()],
        )
        .await?;

    Ok((raw, row_to_record(&row)))
}

/// Marks the key inactive and stamps the revocation time. Idempotent: the second
/// call finds no active row to update and returns `false`.
pub async fn revoke_api_key(db: &DbClient, id: Uuid) -> Result<bool, StorageError> {
    let client = db.get().await?;
    let changed = client
        .execute(
            "UPDATE api_keys SET is_active = false, revoked_at = now() \
             WHERE id = $1 AND is_active = true",
            &[&id],
        )
        .await?;
    Ok(changed > 0)
}

/// Single transaction: locks the existing active row, retires it, inserts a new
/// active row carrying the same identity. Rolls back atomically on any failure.
pub async fn rotate_api_key(db: &DbClient, id: Uuid) -> Result<(String, ApiKeyRecord), StorageError> {
    let mut client = db.get().await?;
    let txn = client.transaction().await?;

    let existing = txn
        .query_opt(
            "SELECT user_id, user_email, role FROM api_keys \
             WHERE id = $1 AND is_active = true FOR UPDATE",
            &[&id],
        )
        .await?
        .ok_or(StorageError::NotFound)?;

    let user_id: String = existing.get(0);
    let user_email: String = existing.get(1);
    let role_str: String = existing.get(2);

    txn.execute(
        "UPDATE api_keys SET is_active = false, revoked_at = now() WHERE id = $1",
        &[&id],
    )
    .await?;

    let raw = generate_raw_key();
    let hash = hash_key(&raw);
    let prefix = key_prefix(&raw);

    let row = txn
        .query_one(
            &format!(
                "INSERT INTO api_keys (user_id, user_email, key_hash, key_prefix, role, is_active) \
                 VALUES ($1, $2, $3, $4, $5, true) RETURNING {SELECT_COLUMNS}"
            ),
            &[&user_id, &user_email, &hash, &prefix, &role_str],
        )
        .await?;

    txn.commit().await?;
    Ok((raw, row_to_record(&row)))
}

/// Looks up by hash among active keys only.
pub async fn lookup_active_key_by_hash(
    db: &DbClient,
    key_hash: &str,
) -> Result<Option<ApiKeyRecord>, StorageError> {
    let client = db.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {SELECT_COLUMNS} FROM api_keys WHERE key_hash = $1 AND is_active = true"),
            &[&key_hash],
        )
        .await?;
    Ok(row.map(|r| row_to_record(&r)))
}

pub async fn list_api_keys(db: &DbClient) -> Result<Vec<ApiKeyRecord>, StorageError> {
    let client = db.get().await?;
    let rows = client
        .query(
            &format!("SELECT {SELECT_COLUMNS} FROM api_keys ORDER BY created_at DESC"),
            &[],
        )
        .await?;
    Ok(rows.iter().map(row_to_record).collect())
}

/// Fire-and-forget `lastUsedAt` update - spawned by the caller after a successful
/// lookup, never awaited on the request path.
pub fn spawn_touch_last_used(db: DbClient, id: Uuid) {
    tokio::spawn(async move {
        let client = match db.get().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "skipping last_used_at update: no connection");
                return;
            }
        };
        if let Err(e) = client
            .execute("UPDATE api_keys SET last_used_at = now() WHERE id = $1", &[&id])
            .await
        {
            tracing::warn!(error = %e, key_id = %id, "failed to update last_used_at");
        }
    });
}
