//! Like-a-Look Server - REST API for similar portrait search
//!
//! Exposes likealook-core functionality via HTTP endpoints:
//! - POST /similar - Find portraits similar to an uploaded image
//! - GET /collections - List similarity collections
//! - GET /resource/{collection}/{id} - Fetch an image or a staged upload

use std::net::SocketAddr;

use anyhow::{Context, Result};
use likealook_server::{create_router_with_state, AppState, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before reading RUST_LOG or any other setting
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "likealook_server=info,likealook_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    config.warn_degraded();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        default_collection = %config.default_collection,
        remote_matcher = config.remote_matcher_url.as_deref().unwrap_or("none"),
        "Starting Like-a-Look server"
    );

    let state = AppState::from_config(&config).context("Failed to initialize application state")?;
    info!(
        metadata_records = state.index.size(),
        resource_roots = state.resources.roots().len(),
        "Application state ready"
    );

    let app = create_router_with_state(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Like-a-Look server listening on http://{}", addr);

    // Peer addresses are needed by the rate limiter's key extractor
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
