//! Persistence gateway.
//!
//! Grounded on `caliber-api/src/db.rs`'s `DbConfig`/`create_pool`/`DbClient` shape
//! (env-driven config, fast recycling, `NoTls`, scoped client acquisition); the
//! pgrx-extension-calling query bodies there are not reusable here, only the
//! pool-lifecycle shape.
//!
//! Opens one pool (max ~10 connections) when `DATABASE_URL` is set; yields a
//! `DbClient` with no pool when it isn't, so every consumer degrades gracefully
//! (reads return empty, writes become no-ops) instead of erroring.

use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::error::StorageError;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: Option<String>,
    pub max_size: usize,
}

impl DbConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            max_size: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }
}

#[derive(Clone)]
pub struct DbClient {
    pool: Option<Pool>,
}

impl DbClient {
    /// Builds a pool when `cfg.database_url` is set; otherwise returns a client with
    /// no pool (every consumer must check `is_configured()` before relying on reads).
    pub fn from_config(cfg: &DbConfig) -> Result<Self, StorageError> {
        let Some(url) = &cfg.database_url else {
            tracing::warn!("DATABASE_URL not set; persistence disabled, running in no-store mode");
            return Ok(Self { pool: None });
        };

        let mut pool_cfg = PoolConfig::new();
        pool_cfg.url = Some(url.clone());
        pool_cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pool_cfg.pool = Some(deadpool_postgres::PoolConfig::new(cfg.max_size));

        let pool = pool_cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;

        Ok(Self { pool: Some(pool) })
    }

    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn get(&self) -> Result<deadpool_postgres::Object, StorageError> {
        let pool = self.pool.as_ref().ok_or(StorageError::NotConfigured)?;
        Ok(pool.get().await?)
    }

    /// Scoped acquisition: acquires a client, runs `f`, and releases it regardless
    /// of outcome (the pool handle's `Drop` does the releasing).
    pub async fn with_client<F, Fut, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(deadpool_postgres::Object) -> Fut,
        Fut: std::future::Future<Output = Result<T, StorageError>>,
    {
        let client = self.get().await?;
        f(client).await
    }
}
