//! Shared body-buffering helper for the middleware stages that need to read (and
//! sometimes rewrite) the JSON request body without consuming it for the next stage.

use axum::{body::Body, extract::Request};
use dynamo_core::DynamoError;
use serde_json::Value;

pub async fn read_json_body(request: Request) -> Result<(Request, Value), DynamoError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, 10 * 1024 * 1024)
        .await
        .map_err(|e| DynamoError::invalid_request(format!("failed to read request body: {e}")))?;
    let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    let request = Request::from_parts(parts, Body::from(bytes));
    Ok((request, value))
}

pub fn replace_json_body(request: Request, value: &Value) -> Request {
    let (parts, _) = request.into_parts();
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    Request::from_parts(parts, Body::from(bytes))
}
