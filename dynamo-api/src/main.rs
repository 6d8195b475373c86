//! dynamo-api server entry point.
//!
//! Bootstraps configuration, the storage pool and upstream client, then starts
//! the axum server. Grounded on `caliber-api/src/main.rs`'s bootstrap shape, with
//! a bounded drain on shutdown added: `caliber-api/src/main.rs` exits as soon as
//! `ctrl_c` fires, while this waits up to `SHUTDOWN_GRACE` for in-flight requests
//! to finish before forcing the process down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dynamo_api::clock::SystemClock;
use dynamo_api::config::AppConfig;
use dynamo_api::state::AppState;
use dynamo_llm::AnthropicClient;
use dynamo_storage::{DbClient, DbConfig};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const UPSTREAM_REQUESTS_PER_MINUTE: u32 = 50;

fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    init_tracing(&config.server.log_level, config.server.node_env.is_production());

    if let Err(e) = config.validate_for_production() {
        tracing::error!(error = %e, "configuration validation failed");
        std::process::exit(1);
    }

    let db_config = DbConfig {
        database_url: config.database_url.clone(),
        max_size: 10,
    };
    let db = DbClient::from_config(&db_config)?;

    let upstream = Arc::new(AnthropicClient::new(
        config.upstream.api_key.expose().to_string(),
        config.upstream.base_url.clone(),
        UPSTREAM_REQUESTS_PER_MINUTE,
    ));

    let state = AppState {
        db,
        upstream,
        upstream_config: Arc::new(config.upstream.clone()),
        auth_config: Arc::new(config.auth.clone()),
        budget_config: Arc::new(config.budget),
        alert_config: Arc::new(config.alert.clone()),
        clock: Arc::new(SystemClock),
        start_time: Instant::now(),
        version: env!("CARGO_PKG_VERSION"),
        cors_origin: config.server.cors_origin.clone(),
    };

    let app = dynamo_api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "dynamo-api listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let serve_task = tokio::spawn(
        axum::serve(listener, app.into_make_service()).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        }),
    );

    shutdown_signal().await;
    tracing::info!("shutdown signal received, draining in-flight requests");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_GRACE, serve_task).await {
        Ok(Ok(Ok(()))) => tracing::info!("shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "server task panicked"),
        Err(_) => tracing::warn!("in-flight requests did not drain within grace period, forcing exit"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
