//! HTTP API: predictions, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use service_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    ErrorResponse, PredictionHandler, WelcomeResponse,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub handler: PredictionHandler,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        handler: PredictionHandler,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            handler,
            health_registry,
            metrics,
            logger,
        }
    }
}

async fn home() -> Json<WelcomeResponse> {
    Json(WelcomeResponse::default())
}

/// Prediction endpoint. The raw body is handed to the handler so that empty
/// and malformed bodies produce the same per-field errors as `{}`.
async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let start = Instant::now();
    let result = state.handler.handle(&body);
    let elapsed = start.elapsed();
    state.metrics.observe_prediction_latency(elapsed);

    match result {
        Ok(response) => {
            state.metrics.inc_prediction(response.prediction);
            state.health_registry.prediction_succeeded().await;
            state.logger.log_prediction(
                response.prediction,
                elapsed,
                state.handler.predictor_version(),
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            let client_error = err.is_client_error();
            state.metrics.inc_request_error(err.kind());
            state
                .logger
                .log_rejected(err.kind(), &err.to_string(), client_error);

            let status = if client_error {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                let health = state.health_registry.prediction_failed(err.to_string()).await;
                if health == ComponentStatus::Unhealthy {
                    error!(
                        component = components::PREDICT_HANDLER,
                        "Prediction handler marked unhealthy after repeated failures"
                    );
                }
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ErrorResponse::from(&err))).into_response()
        }
    }
}

/// 200 while healthy or degraded, 503 when unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// 200 once the artifact is loaded, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
