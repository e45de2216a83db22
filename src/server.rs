//! HTTP server initialization and runtime setup.
//!
//! Handles the database pool, migrations, service wiring, and Axum server lifecycle.

use crate::application::services::ShortenService;
use crate::config::Config;
use crate::domain::clock::SystemClock;
use crate::infrastructure::persistence::{
    SqliteShortUrlRepository, SqliteWindowRepository, pool,
};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - SQLite connection pool
/// - Apply migrations
/// - Repositories and the shortening service
/// - Axum HTTP server with graceful shutdown on Ctrl+C / SIGTERM
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = pool::connect(
        &config.database_url,
        config.db_max_connections,
        config.store_timeout(),
    )
    .await
    .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    pool::migrate(&pool)
        .await
        .context("Failed to run migrations")?;

    let pool = Arc::new(pool);
    let short_urls = Arc::new(SqliteShortUrlRepository::new(
        pool.clone(),
        config.store_timeout(),
    ));
    let windows = Arc::new(SqliteWindowRepository::new(
        pool.clone(),
        config.store_timeout(),
    ));

    let shorten_service = Arc::new(ShortenService::new(
        short_urls,
        windows,
        Arc::new(SystemClock),
        config.shorten_policy(),
    ));

    let state = AppState::new(shorten_service, config.behind_proxy);
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
