//! Upstream failure taxonomy, kept separate from `dynamo_core::ErrorCode` so this
//! crate has no axum dependency - `dynamo-api` maps these into `DynamoError` at the
//! call site.

use dynamo_core::{DynamoError, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("upstream rate limit exceeded")]
    RateLimited,

    #[error("upstream rejected credentials")]
    InvalidApiKey,

    #[error("upstream is overloaded")]
    Overloaded,

    #[error("upstream provider error: {message}")]
    ProviderError { message: String },
}

impl From<LlmError> for DynamoError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited => DynamoError::from_code(ErrorCode::RateLimited),
            LlmError::InvalidApiKey => DynamoError::from_code(ErrorCode::UpstreamAuthError),
            LlmError::Overloaded => DynamoError::from_code(ErrorCode::ApiOverloaded),
            LlmError::ProviderError { message } => DynamoError::new(ErrorCode::UpstreamError, message),
        }
    }
}
