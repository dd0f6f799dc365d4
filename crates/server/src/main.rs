use anyhow::Result;
use axum::Router as AxumRouter;
use firin_core::config::AppConfig;
use server::{app, bridge};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` takes precedence when set; otherwise the configured level
/// applies to this workspace's crates and `warn` to everything else. The
/// `audit` target always logs at `info` so the trail survives level tuning.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!(
            "warn,firin_core={level},server={level},cli={level},audit=info"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        // "pretty" and any other value default to human-readable output.
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("starting storefront server");

    let pool = SqlitePool::connect(&config.database.url)
        .await
        .map_err(|e| anyhow::anyhow!("database connection failed: {e}"))?;

    let services = app::AppServices::from_sqlite(&config, pool)
        .map_err(|e| anyhow::anyhow!("service initialization failed: {e}"))?;
    services.start_maintenance(&config);

    let router = app::build_router(&config, &services)
        .map_err(|e| anyhow::anyhow!("route registration failed: {e}"))?;

    let state = Arc::new(bridge::ServerState { router });

    let axum_app = AxumRouter::new()
        .fallback(bridge::dispatch)
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .layer(CompressionLayer::new());

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.bind_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;
    info!(address = %addr, "storefront server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(
        listener,
        axum_app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    if let Err(e) = server.with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error occurred");
    }

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, starting graceful shutdown");
}
