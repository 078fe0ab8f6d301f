//! Liveness and readiness tracking for the prediction service
//!
//! Components report their own status; the overall status is the worst of
//! them. Readiness additionally requires the artifact to be loaded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, with recent faults
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_version: Option<String>,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status among components; healthy when there are none
    pub fn compute_status<'a>(
        components: impl IntoIterator<Item = &'a ComponentHealth>,
    ) -> ComponentStatus {
        components
            .into_iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Consecutive internal prediction faults before the handler is reported unhealthy
pub const UNHEALTHY_AFTER_FAULTS: u32 = 5;

/// Component names for health tracking
pub mod components {
    pub const ARTIFACT: &str = "artifact";
    pub const PREDICT_HANDLER: &str = "predict_handler";
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    artifact_version: Option<String>,
    consecutive_faults: u32,
}

/// Shared health registry
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record a successfully loaded artifact; the service becomes ready
    pub async fn artifact_loaded(&self, version: &str) {
        let mut state = self.state.write().await;
        state.artifact_version = Some(version.to_string());
        state
            .components
            .insert(components::ARTIFACT.to_string(), ComponentHealth::healthy());
    }

    /// Record a successful prediction, clearing an earlier degradation
    pub async fn prediction_succeeded(&self) {
        let faulted = {
            let state = self.state.read().await;
            state.consecutive_faults > 0
                || state
                    .components
                    .get(components::PREDICT_HANDLER)
                    .map(|c| c.status != ComponentStatus::Healthy)
                    .unwrap_or(false)
        };
        if faulted {
            let mut state = self.state.write().await;
            state.consecutive_faults = 0;
            state.components.insert(
                components::PREDICT_HANDLER.to_string(),
                ComponentHealth::healthy(),
            );
        }
    }

    /// Record an internal prediction fault. The handler is degraded, and
    /// unhealthy once [`UNHEALTHY_AFTER_FAULTS`] faults occur in a row.
    pub async fn prediction_failed(&self, message: impl Into<String>) -> ComponentStatus {
        let mut state = self.state.write().await;
        state.consecutive_faults = state.consecutive_faults.saturating_add(1);

        let health = if state.consecutive_faults >= UNHEALTHY_AFTER_FAULTS {
            ComponentHealth::unhealthy(format!(
                "{} consecutive failures, last: {}",
                state.consecutive_faults,
                message.into()
            ))
        } else {
            ComponentHealth::degraded(message)
        };
        let status = health.status;
        state
            .components
            .insert(components::PREDICT_HANDLER.to_string(), health);
        status
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: HealthResponse::compute_status(state.components.values()),
            artifact_version: state.artifact_version.clone(),
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let reason = if state.artifact_version.is_none() {
            Some("Artifact not yet loaded")
        } else if HealthResponse::compute_status(state.components.values())
            == ComponentStatus::Unhealthy
        {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}
