//! Sleep disorder prediction service
//!
//! Loads the trained artifact once, then serves predictions, health checks
//! and metrics over HTTP until interrupted.

use anyhow::{Context, Result};
use service_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    ModelArtifact, PredictionHandler, SleepPredictor,
};
use sleep_service::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting sleep-service");

    let config = ServiceConfig::load()?;
    let addr = config.socket_addr()?;
    info!(
        service_name = %config.service_name,
        artifact_path = %config.artifact_path.display(),
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PREDICT_HANDLER).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);

    // No fallback model: a missing or invalid artifact stops startup
    let artifact = match ModelArtifact::load(&config.artifact_path) {
        Ok(artifact) => artifact,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Failed to load artifact");
            return Err(e).context("Cannot start without a model artifact");
        }
    };

    metrics.set_artifact(artifact.version(), artifact.classifier_kind());
    logger.log_artifact_loaded(
        &config.artifact_path.display().to_string(),
        artifact.version(),
        artifact.classifier_kind(),
    );
    health_registry.artifact_loaded(artifact.version()).await;

    let handler = PredictionHandler::new(Arc::new(artifact));
    let app_state = Arc::new(api::AppState::new(
        handler,
        health_registry,
        metrics,
        logger.clone(),
    ));

    logger.log_startup(SERVICE_VERSION, &addr.to_string());

    let shutdown_logger = logger.clone();
    api::serve(addr, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
