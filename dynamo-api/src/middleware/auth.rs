//! Authentication stage.
//!
//! Grounded on `caliber-api/src/middleware/auth.rs`'s `from_fn_with_state` +
//! extension-injection shape and `caliber-api/src/auth.rs`'s `Claims`/clock-checked
//! verification, generalized from a 2-mode (api_key/jwt) scheme to a 3-mode one
//! (mock/api_key/signed-bearer) and from tenant ids to role-by-group.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use dynamo_core::{AuthContext, AuthMethod, DynamoError, RoleName};
use dynamo_storage::DbClient;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::str::FromStr;

use crate::clock::JwtClock;
use crate::config::{AuthConfig, AuthMode};

const API_KEY_PREFIX: &str = "dynamo-sk-";

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    id: Option<String>,
    email: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    groups: Option<Vec<String>>,
    role: Option<String>,
    exp: i64,
}

/// Fixed priority: first matching group wins.
fn role_from_groups(groups: &[String]) -> Option<RoleName> {
    let lower: Vec<String> = groups.iter().map(|g| g.to_lowercase()).collect();
    if lower.iter().any(|g| g.contains("admins")) {
        return Some(RoleName::Admin);
    }
    if lower.iter().any(|g| g.contains("engineers")) {
        return Some(RoleName::Engineer);
    }
    if lower.iter().any(|g| g.contains("power")) {
        return Some(RoleName::PowerUser);
    }
    if lower.iter().any(|g| g.contains("business")) {
        return Some(RoleName::Business);
    }
    None
}

/// Groups present but none match the priority list is a distinct outcome from
/// groups absent: the embedded `role` claim is only trusted when the identity
/// provider supplied no group membership to rank at all.
fn resolve_role(claims: &Claims) -> RoleName {
    match &claims.groups {
        Some(groups) if !groups.is_empty() => role_from_groups(groups).unwrap_or(RoleName::DEFAULT),
        _ => claims
            .role
            .as_deref()
            .map(|r| RoleName::from_str(r).unwrap())
            .unwrap_or(RoleName::DEFAULT),
    }
}

fn verify_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, DynamoError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| DynamoError::invalid_token())?;

    if data.claims.exp < now.timestamp() {
        return Err(DynamoError::invalid_token());
    }

    Ok(data.claims)
}

fn mock_auth(headers: &axum::http::HeaderMap) -> AuthContext {
    let get = |primary: &str, fallback: &str| -> Option<String> {
        headers
            .get(primary)
            .or_else(|| headers.get(fallback))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    let email = get("x-mock-user-email", "x-user-email").unwrap_or_else(|| "test@dynamo.works".to_string());
    let role = get("x-mock-user-role", "x-user-role")
        .map(|r| RoleName::from_str(&r).unwrap())
        .unwrap_or(RoleName::DEFAULT);
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| dynamo_core::derive_user_id(&email));

    AuthContext {
        user_id: Some(user_id),
        user_email: Some(email),
        display_name: None,
        role,
        api_key_id: None,
        auth_method: AuthMethod::Mock,
    }
}

async fn api_key_auth(db: &DbClient, token: &str) -> Result<AuthContext, DynamoError> {
    if !dynamo_core::is_valid_key_format(token) {
        return Err(DynamoError::invalid_api_key());
    }
    let hash = dynamo_core::hash_key(token);
    let record = dynamo_storage::lookup_active_key_by_hash(db, &hash)
        .await
        .map_err(DynamoError::from)?
        .ok_or_else(DynamoError::invalid_api_key)?;

    dynamo_storage::spawn_touch_last_used(db.clone(), record.id);

    Ok(AuthContext {
        user_id: Some(record.user_id),
        user_email: Some(record.user_email),
        display_name: None,
        role: record.role,
        api_key_id: Some(record.id.to_string()),
        auth_method: AuthMethod::ApiKey,
    })
}

fn signed_bearer_auth(
    token: &str,
    auth_config: &AuthConfig,
    clock: &dyn JwtClock,
) -> Result<AuthContext, DynamoError> {
    let claims = verify_token(token, auth_config.jwt_secret.expose(), clock.now())?;

    let user_id = claims
        .sub
        .clone()
        .or_else(|| claims.id.clone())
        .or_else(|| claims.email.clone())
        .ok_or_else(DynamoError::invalid_token)?;

    let role = resolve_role(&claims);

    Ok(AuthContext {
        user_id: Some(user_id),
        user_email: claims.email.clone(),
        display_name: claims.display_name.clone(),
        role,
        api_key_id: None,
        auth_method: AuthMethod::Bearer,
    })
}

pub async fn auth_middleware(
    State(db): State<DbClient>,
    State(auth_config): State<Arc<AuthConfig>>,
    State(clock): State<Arc<dyn JwtClock>>,
    mut request: Request,
    next: Next,
) -> Result<Response, DynamoError> {
    let headers = request.headers().clone();

    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let ctx = match (&auth_config.mode, bearer.as_deref()) {
        (_, Some(token)) if token.starts_with(API_KEY_PREFIX) => api_key_auth(&db, token).await?,
        (_, Some(token)) if token.starts_with("eyJ") => {
            let ctx = signed_bearer_auth(token, &auth_config, clock.as_ref())?;
            dynamo_storage::spawn_upsert_user_profile(
                db.clone(),
                ctx.user_id.clone().unwrap_or_default(),
                ctx.user_email.clone().unwrap_or_default(),
                ctx.display_name.clone(),
                ctx.role,
                Vec::new(),
            );
            ctx
        }
        (AuthMode::Mock, _) => mock_auth(&headers),
        (AuthMode::Token, None) => return Err(DynamoError::auth_required()),
        (AuthMode::Token, Some(_)) => return Err(DynamoError::invalid_token()),
    };

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clocks;

    fn make_token(secret: &str, exp: i64, role: Option<&str>, groups: Option<Vec<&str>>) -> String {
        #[derive(serde::Serialize)]
        struct Out {
            sub: String,
            email: String,
            exp: i64,
            #[serde(skip_serializing_if = "Option::is_none")]
            role: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            groups: Option<Vec<String>>,
        }
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &Out {
                sub: "user-1".to_string(),
                email: "user@dynamo.works".to_string(),
                exp,
                role: role.map(|r| r.to_string()),
                groups: groups.map(|g| g.into_iter().map(|s| s.to_string()).collect()),
            },
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn expired_token_is_rejected() {
        let clock = test_clocks::valid();
        let token = make_token("test-secret", clock.0.timestamp() - 100, None, None);
        assert!(verify_token(&token, "test-secret", clock.0).is_err());
    }

    #[test]
    fn valid_token_resolves_role_from_groups_by_priority() {
        let clock = test_clocks::valid();
        let token = make_token(
            "test-secret",
            clock.0.timestamp() + 100,
            Some("engineer"),
            Some(vec!["Everyone", "Engineers"]),
        );
        let claims = verify_token(&token, "test-secret", clock.0).unwrap();
        assert_eq!(resolve_role(&claims), RoleName::Engineer);
    }

    #[test]
    fn embedded_role_used_when_groups_absent() {
        let clock = test_clocks::valid();
        let token = make_token("test-secret", clock.0.timestamp() + 100, Some("engineer"), None);
        let claims = verify_token(&token, "test-secret", clock.0).unwrap();
        assert_eq!(resolve_role(&claims), RoleName::Engineer);
    }

    #[test]
    fn default_role_used_when_groups_present_but_unmatched() {
        let clock = test_clocks::valid();
        let token = make_token(
            "test-secret",
            clock.0.timestamp() + 100,
            Some("engineer"),
            Some(vec!["Everyone"]),
        );
        let claims = verify_token(&token, "test-secret", clock.0).unwrap();
        assert_eq!(resolve_role(&claims), RoleName::DEFAULT);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let clock = test_clocks::valid();
        let token = make_token("test-secret", clock.0.timestamp() + 100, None, None);
        assert!(verify_token(&token, "wrong-secret", clock.0).is_err());
    }
}
