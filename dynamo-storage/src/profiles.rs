//! User-profile persistence, upserted on each successful token-based authentication.
//!
//! Fire-and-forget upsert into user profiles: sets `lastLogin=now`, preserves
//! `firstLogin`, and refreshes role/groups/displayName - mirrors the
//! fire-and-forget idiom in `caliber-api/src/auth.rs`.

use std::str::FromStr;

use dynamo_core::catalog::RoleName;

use crate::error::StorageError;
use crate::pool::DbClient;

/// `firstLogin` is only ever set by the `INSERT` branch of the upsert; the `DO
/// UPDATE` clause never touches it, so it survives every subsequent login.
pub async fn upsert_user_profile(
    db: &DbClient,
    user_id: &str,
    email: &str,
    display_name: Option<&str>,
    role: RoleName,
    identity_groups: &[String],
) -> Result<(), StorageError> {
    let client = db.get().await?;
    client
        .execute(
            "INSERT INTO user_profiles (user_id, email, display_name, role, identity_groups, first_login, last_login) \
             VALUES ($1, $2, $3, $4, $5, now(), now()) \
             ON CONFLICT (user_id) DO UPDATE SET \
               email = EXCLUDED.email, \
               display_name = EXCLUDED.display_name, \
               role = EXCLUDED.role, \
               identity_groups = EXCLUDED.identity_groups, \
               last_login = now()",
            &[&user_id, &email, &display_name, &role.as_str(), &identity_groups],
        )
        .await?;
    Ok(())
}

/// Looks up a user's own stored role by id, independent of whoever is asking.
/// Returns `None` if the user has never logged in (no profile row yet), in which
/// case callers should fall back to the catalog default rather than the caller's role.
pub async fn get_user_role(db: &DbClient, user_id: &str) -> Result<Option<RoleName>, StorageError> {
    let client = db.get().await?;
    let row = client
        .query_opt("SELECT role FROM user_profiles WHERE user_id = $1", &[&user_id])
        .await?;
    Ok(row.map(|r| {
        let role: String = r.get(0);
        RoleName::from_str(&role).unwrap_or(RoleName::DEFAULT)
    }))
}

/// Fire-and-forget wrapper - spawned by the auth stage after a successful
/// signed-bearer verification, never awaited on the request path.
pub fn spawn_upsert_user_profile(
    db: DbClient,
    user_id: String,
    email: String,
    display_name: Option<String>,
    role: RoleName,
    identity_groups: Vec<String>,
) {
    tokio::spawn(async move {
        if !db.is_configured() {
            return;
        }
        if let Err(e) = upsert_user_profile(
            &db,
            &user_id,
            &email,
            display_name.as_deref(),
            role,
            &identity_groups,
        )
        .await
        {
            tracing::warn!(error = %e, user_id = %user_id, "failed to upsert user profile");
        }
    });
}
