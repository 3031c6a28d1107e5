//! # Medical Drone Fleet API Server
//!
//! Binary entry point for the REST/GraphQL API service and the battery
//! discharge task.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drone_api::{ApiContext, Config, StoreBackend, build_router};
use drone_persistence::{MemoryStore, SharedFleetStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = drone_api::VERSION,
        backend = ?config.store_backend,
        "Starting Medical Drone Fleet API"
    );

    let store: SharedFleetStore = match config.store_backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Scylla => {
            tracing::info!(
                hosts = ?config.scylla.hosts,
                keyspace = %config.scylla.keyspace,
                "Connecting to ScyllaDB"
            );
            let store = drone_persistence::init_scylla(config.scylla.clone()).await?;
            tracing::info!("ScyllaDB connected");
            Arc::new(store)
        }
    };

    let ctx = ApiContext::new(store, config.policy);

    // Battery discharge task, stopped on shutdown
    let cancel = CancellationToken::new();
    let monitor = tokio::spawn(
        ctx.fleet
            .monitor
            .clone()
            .run(config.battery_check_interval, cancel.clone()),
    );

    let app = build_router(ctx, &config);

    let addr = config.server_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        playground = config.enable_playground,
        admin_reset = config.enable_admin_reset,
        "HTTP server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    monitor.await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
