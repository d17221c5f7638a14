//! hf-server: HTTP API and server lifecycle.
//!
//! This crate ties the asset services to an axum router. It provides:
//!
//! - The catalog, stream, upload, and delete API
//! - Static serving of the derived HLS tree under `/hls`
//! - Startup sweep of leftover raw files before the listener binds
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use hf_assets::{AssetStore, FsAssetStore};
use hf_av::{Encoder, FfmpegEncoder, ToolRegistry};
use hf_core::config::Config;

use crate::context::AppContext;

/// Build the [`AppContext`] for `config`: create the storage roots, discover
/// ffmpeg, and wire the asset services.
pub fn build_context(config: Config) -> hf_core::Result<AppContext> {
    let store = FsAssetStore::new(&config.storage);
    store.init()?;
    tracing::info!(
        raw = %store.raw_root().display(),
        derived = %store.derived_root().display(),
        "Storage ready"
    );

    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }
    let encoder = FfmpegEncoder::from_registry(&tools, &config.encoder)?;

    Ok(AppContext::new(
        config,
        Arc::new(store) as Arc<dyn AssetStore>,
        Arc::new(encoder) as Arc<dyn Encoder>,
        Arc::new(tools),
    ))
}

/// Start the hlsforge server.
///
/// Converts leftover raw files first (unless disabled), then serves until a
/// shutdown signal is received.
pub async fn start(config: Config) -> hf_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| hf_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = build_context(config)?;

    if ctx.config.storage.sweep_on_start {
        ctx.services.sweep().run().await;
    } else {
        tracing::info!("Startup sweep disabled");
    }

    let app = router::build_router(ctx.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| hf_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
