//! Canonical error taxonomy for the proxy.
//!
//! Mirrors the stage design directly: one `Copy` error-code enum carrying the
//! HTTP-status mapping, wrapped by a struct carrying the instance message, optional
//! details, and the correlation id. Every stage returns `DynamoError`; no stage
//! attempts local recovery of another stage's error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    Forbidden,
    NotFound,
    InvalidApiKey,
    InvalidToken,
    AuthRequired,
    SensitiveDataBlocked,
    BudgetExceeded,
    RateLimited,
    UpstreamAuthError,
    ApiOverloaded,
    UpstreamError,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::SensitiveDataBlocked => StatusCode::BAD_REQUEST,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidApiKey
            | ErrorCode::InvalidToken
            | ErrorCode::AuthRequired => StatusCode::UNAUTHORIZED,
            ErrorCode::BudgetExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::RateLimited => StatusCode::BAD_GATEWAY,
            ErrorCode::UpstreamAuthError => StatusCode::BAD_GATEWAY,
            ErrorCode::ApiOverloaded => StatusCode::BAD_GATEWAY,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "The request body is malformed or missing required fields",
            ErrorCode::Forbidden => "You do not have permission to access this resource",
            ErrorCode::NotFound => "The requested resource does not exist",
            ErrorCode::InvalidApiKey => "The supplied API key is invalid or has been revoked",
            ErrorCode::InvalidToken => "The supplied bearer token could not be verified",
            ErrorCode::AuthRequired => "Authentication credentials are required",
            ErrorCode::SensitiveDataBlocked => "The request was blocked because it contains sensitive data",
            ErrorCode::BudgetExceeded => "The monthly token budget for this account has been exceeded",
            ErrorCode::RateLimited => "The upstream provider is rate-limiting requests",
            ErrorCode::UpstreamAuthError => "The upstream provider rejected our credentials",
            ErrorCode::ApiOverloaded => "The upstream provider is temporarily overloaded",
            ErrorCode::UpstreamError => "The upstream provider returned an error",
            ErrorCode::InternalError => "An internal error occurred",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DynamoError {
    #[serde(skip)]
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Only set for upstream errors whose status code should pass through (< 500).
    #[serde(skip)]
    pub upstream_status: Option<u16>,
}

impl DynamoError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            request_id: None,
            upstream_status: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        if let Some(status) = self.upstream_status {
            if let Ok(sc) = StatusCode::from_u16(status) {
                if sc.as_u16() < 500 {
                    return sc;
                }
            }
        }
        self.code.status_code()
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn invalid_api_key() -> Self {
        Self::from_code(ErrorCode::InvalidApiKey)
    }

    pub fn invalid_token() -> Self {
        Self::from_code(ErrorCode::InvalidToken)
    }

    pub fn auth_required() -> Self {
        Self::from_code(ErrorCode::AuthRequired)
    }

    pub fn sensitive_data_blocked(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SensitiveDataBlocked, message)
    }

    pub fn budget_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BudgetExceeded, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorBodyInner<'a>,
}

#[derive(Serialize)]
struct ErrorBodyInner<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: &'a Option<String>,
}

impl IntoResponse for DynamoError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: ErrorBodyInner {
                message: &self.message,
                kind: self.code.as_str(),
                code: self.code,
                request_id: &self.request_id,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidApiKey => "invalid_api_key",
            ErrorCode::InvalidToken => "invalid_token",
            ErrorCode::AuthRequired => "auth_required",
            ErrorCode::SensitiveDataBlocked => "sensitive_data_blocked",
            ErrorCode::BudgetExceeded => "budget_exceeded",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::UpstreamAuthError => "upstream_auth_error",
            ErrorCode::ApiOverloaded => "api_overloaded",
            ErrorCode::UpstreamError => "upstream_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

pub type DynamoResult<T> = Result<T, DynamoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorCode::AuthRequired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::BudgetExceeded.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorCode::SensitiveDataBlocked.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_status_passthrough_below_500() {
        let mut err = DynamoError::from_code(ErrorCode::UpstreamError);
        err.upstream_status = Some(404);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn upstream_status_above_500_falls_back_to_code_default() {
        let mut err = DynamoError::from_code(ErrorCode::UpstreamError);
        err.upstream_status = Some(503);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
