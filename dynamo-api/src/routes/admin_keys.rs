//! Admin API-key surface, all admin-only, delegating to the pure format/hash helpers.

use axum::{
    extract::{Path, Request, State},
    Json,
};
use dynamo_core::{AuthContext, DynamoError, RoleName};
use dynamo_storage::{ApiKeyRecord, DbClient};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn require_admin(request: &Request) -> Result<(), DynamoError> {
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(DynamoError::auth_required)?;
    if auth.role != RoleName::Admin {
        return Err(DynamoError::forbidden("admin only"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub user_email: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub key: String,
    #[serde(flatten)]
    pub record: ApiKeyRecordView,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyRecordView {
    pub id: Uuid,
    pub user_id: String,
    pub user_email: String,
    pub key_prefix: String,
    pub role: RoleName,
}

impl From<&ApiKeyRecord> for ApiKeyRecordView {
    fn from(r: &ApiKeyRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id.clone(),
            user_email: r.user_email.clone(),
            key_prefix: r.key_prefix.clone(),
            role: r.role,
        }
    }
}

pub async fn create_api_key(
    State(db): State<DbClient>,
    request: Request,
) -> Result<Json<CreateApiKeyResponse>, DynamoError> {
    require_admin(&request)?;
    let bytes = axum::body::to_bytes(request.into_body(), 64 * 1024)
        .await
        .map_err(|e| DynamoError::invalid_request(format!("failed to read body: {e}")))?;
    let payload: CreateApiKeyRequest =
        serde_json::from_slice(&bytes).map_err(|e| DynamoError::invalid_request(format!("invalid body: {e}")))?;
    let role = payload
        .role
        .as_deref()
        .map(|r| r.parse::<RoleName>().unwrap())
        .unwrap_or(RoleName::DEFAULT);

    let (raw_key, record) = dynamo_storage::create_api_key(&db, &payload.user_email, role)
        .await
        .map_err(DynamoError::from)?;

    Ok(Json(CreateApiKeyResponse { key: raw_key, record: (&record).into() }))
}

pub async fn list_api_keys(
    State(db): State<DbClient>,
    request: Request,
) -> Result<Json<Vec<ApiKeyRecordView>>, DynamoError> {
    require_admin(&request)?;
    let keys = dynamo_storage::list_api_keys(&db).await.map_err(DynamoError::from)?;
    Ok(Json(keys.iter().map(ApiKeyRecordView::from).collect()))
}

pub async fn revoke_api_key(
    State(db): State<DbClient>,
    Path(id): Path<Uuid>,
    request: Request,
) -> Result<Json<serde_json::Value>, DynamoError> {
    require_admin(&request)?;
    let revoked = dynamo_storage::revoke_api_key(&db, id).await.map_err(DynamoError::from)?;
    if !revoked {
        return Err(DynamoError::not_found("no active key with that id"));
    }
    Ok(Json(serde_json::json!({ "revoked": true })))
}

pub async fn rotate_api_key(
    State(db): State<DbClient>,
    Path(id): Path<Uuid>,
    request: Request,
) -> Result<Json<CreateApiKeyResponse>, DynamoError> {
    require_admin(&request)?;
    let (raw_key, record) = dynamo_storage::rotate_api_key(&db, id).await.map_err(DynamoError::from)?;
    Ok(Json(CreateApiKeyResponse { key: raw_key, record: (&record).into() }))
}
