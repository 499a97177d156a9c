//! Typed Stash server
//!
//! Hosts one storage namespace behind an HTTP API.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typed_stash::{create_router, spawn_maintenance_task, AppState, Config, Storage};

/// Main entry point for the storage server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the storage and reconcile its metadata snapshot
/// 4. Start background maintenance task
/// 5. Start HTTP server on configured port
/// 6. On SIGINT/SIGTERM, stop maintenance and flush the snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typed_stash=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Typed Stash server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: name={}, store_name={}, max_age={}ms, port={}, flush_interval={}s",
        config.name, config.store_name, config.max_age, config.server_port, config.flush_interval
    );

    let storage = Storage::open(config.storage_options())
        .await
        .context("failed to open storage")?;

    let maintenance_handle = spawn_maintenance_task(
        storage.clone(),
        Duration::from_secs(config.flush_interval),
    );
    info!("Background maintenance task started");

    let app = create_router(AppState::new(storage.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(maintenance_handle))
        .await
        .context("server error")?;

    storage.close().await.context("failed to flush storage")?;
    info!("Server shutdown complete");

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops maintenance.
async fn shutdown_signal(maintenance_handle: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    maintenance_handle.abort();
    warn!("Maintenance task aborted");
}
