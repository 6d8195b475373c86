//! Model router stage.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use dynamo_core::{role_definition, DynamoError, RoleName, MODEL_CATALOG, MODEL_SONNET};
use serde_json::Value;

use super::body::{read_json_body, replace_json_body};

#[derive(Debug, Clone)]
pub struct RouterContext {
    pub resolved_model: String,
    pub downgraded: bool,
}

/// `admin` always passes through unchanged. Otherwise a requested model outside the
/// role's permitted set is downgraded to the highest-tier permitted model; an empty
/// permitted set falls back to the system default.
pub fn resolve_model(requested: &str, role: RoleName) -> RouterContext {
    if role == RoleName::Admin {
        return RouterContext { resolved_model: requested.to_string(), downgraded: false };
    }

    let def = role_definition(role);
    if def.permitted_models.iter().any(|m| m == requested) {
        return RouterContext { resolved_model: requested.to_string(), downgraded: false };
    }

    let fallback = MODEL_CATALOG
        .iter()
        .filter(|m| def.permitted_models.contains(&m.id))
        .max_by_key(|m| m.tier)
        .map(|m| m.id.clone())
        .unwrap_or_else(|| MODEL_SONNET.to_string());

    RouterContext { resolved_model: fallback, downgraded: true }
}

pub async fn router_middleware(mut request: Request, next: Next) -> Result<Response, DynamoError> {
    let role = request
        .extensions()
        .get::<dynamo_core::AuthContext>()
        .map(|a| a.role)
        .unwrap_or(RoleName::DEFAULT);

    let (req, mut body) = read_json_body(request).await?;
    request = req;

    let requested = body.get("model").and_then(Value::as_str).unwrap_or(MODEL_SONNET).to_string();
    let router_ctx = resolve_model(&requested, role);

    if let Value::Object(map) = &mut body {
        map.insert("model".to_string(), Value::String(router_ctx.resolved_model.clone()));
    }
    request = replace_json_body(request, &body);

    let downgraded = router_ctx.downgraded;
    request.extensions_mut().insert(router_ctx);

    let mut response = next.run(request).await;
    if downgraded {
        response.headers_mut().insert("x-model-downgraded", HeaderValue::from_static("true"));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_never_downgraded() {
        let ctx = resolve_model("claude-opus-4-20250514", RoleName::Admin);
        assert!(!ctx.downgraded);
        assert_eq!(ctx.resolved_model, "claude-opus-4-20250514");
    }

    #[test]
    fn permitted_model_passes_through() {
        let ctx = resolve_model("claude-haiku-4-20250514", RoleName::Business);
        assert!(!ctx.downgraded);
    }

    #[test]
    fn disallowed_model_downgrades_to_highest_permitted_tier() {
        let ctx = resolve_model("claude-opus-4-20250514", RoleName::Business);
        assert!(ctx.downgraded);
        assert_eq!(ctx.resolved_model, "claude-sonnet-4-20250514");
    }
}
