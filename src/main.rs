//! Wrapper Core service.
//!
//! Serves the safety wrapper pipeline over HTTP: every prompt is sent to
//! the configured model and its output is gated by the configured policy.

use std::sync::Arc;

use tokio::net::TcpListener;

use wrapper_core::config::Config;
use wrapper_core::engine::Pipeline;
use wrapper_core::logging;

mod api;

use crate::api::build_router;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The wrapper session serving every request.
    pub pipeline: Arc<Pipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Initialize logging
    logging::init();

    tracing::info!("Starting Wrapper Core v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        policy = %config.safety.policy,
        provider = %config.model.provider,
        model = %config.model.name,
        log_file = %config.storage.log_file.display(),
        history_file = %config.storage.history_file.display(),
        "Configuration loaded"
    );

    // Build the wrapper pipeline; fails before any model call on bad config
    let pipeline = Pipeline::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to build pipeline");
        anyhow::anyhow!("Pipeline error: {}", e)
    })?;

    if config.safety.max_rounds.is_none() {
        tracing::warn!("No max_rounds cap set - requery termination relies on the policy");
    }

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
