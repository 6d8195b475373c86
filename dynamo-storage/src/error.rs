//! Storage-layer error type and its conversion into the canonical taxonomy.
//!
//! Grounded on `caliber-api/src/error.rs`'s `From<tokio_postgres::Error>` /
//! `From<deadpool_postgres::PoolError>` conversions, generalized into a dedicated
//! `StorageError` so `dynamo-storage` does not need to depend on `axum`.

use dynamo_core::{DynamoError, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no database configured")]
    NotConfigured,
    #[error("record not found")]
    NotFound,
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    #[error("failed to initialize connection pool: {0}")]
    PoolInit(#[from] deadpool_postgres::CreatePoolError),
}

impl From<StorageError> for DynamoError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "storage error");
        DynamoError::new(ErrorCode::InternalError, "a storage operation failed")
    }
}
