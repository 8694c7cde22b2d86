//! # Stitch Storefront API
//!
//! Binary entry point: configuration, logging, database, cache, HTTP server.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stitch_db::{Database, DbConfig};
use storefront_api::{router, ApiConfig, AppState, CacheHandles, RedisCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront_api=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Stitch storefront API...");

    let config = ApiConfig::load().context("Failed to load configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        redis = config.redis_url.is_some(),
        "Configuration loaded"
    );

    // Open database (migrations run on connect)
    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.database_max_connections),
    )
    .await
    .context("Failed to open database")?;

    // Connect to Redis (optional)
    let cache = match config.redis_url.as_deref() {
        Some(url) => match RedisCache::connect(url).await {
            Ok(redis) => {
                info!("Connected to Redis");
                CacheHandles::new(redis)
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis, continuing without a cache");
                CacheHandles::noop()
            }
        },
        None => {
            warn!("REDIS_URL not set, running without a cache");
            CacheHandles::noop()
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(config, db.clone(), cache);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Storefront API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
