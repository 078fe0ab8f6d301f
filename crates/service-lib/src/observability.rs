//! Prometheus metrics and structured event logging for the prediction service

use crate::labels::SleepDisorder;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge_vec, Histogram,
    IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Registered once per process; `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<ServiceMetricsInner>> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    request_errors_total: IntCounterVec,
    artifact_info: IntGaugeVec,
}

impl ServiceMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            prediction_latency_seconds: register_histogram!(
                "sleep_service_prediction_latency_seconds",
                "Time spent serving a prediction request end to end, rejected requests included",
                LATENCY_BUCKETS.to_vec()
            )?,
            predictions_total: register_int_counter_vec!(
                "sleep_service_predictions_total",
                "Predictions served, by label",
                &["label"]
            )?,
            request_errors_total: register_int_counter_vec!(
                "sleep_service_request_errors_total",
                "Rejected or failed prediction requests, by error kind",
                &["kind"]
            )?,
            artifact_info: register_int_gauge_vec!(
                "sleep_service_artifact_info",
                "Information about the loaded model artifact",
                &["version", "classifier"]
            )?,
        })
    }
}

/// Handle to the process-wide service metrics.
///
/// Clones share the same underlying metrics, which are exposed through the
/// default Prometheus registry.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match ServiceMetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register service metrics, metrics disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&ServiceMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_prediction_latency(&self, elapsed: Duration) {
        if let Some(inner) = self.inner() {
            inner
                .prediction_latency_seconds
                .observe(elapsed.as_secs_f64());
        }
    }

    pub fn inc_prediction(&self, label: SleepDisorder) {
        if let Some(inner) = self.inner() {
            inner
                .predictions_total
                .with_label_values(&[label.as_str()])
                .inc();
        }
    }

    pub fn inc_request_error(&self, kind: &str) {
        if let Some(inner) = self.inner() {
            inner.request_errors_total.with_label_values(&[kind]).inc();
        }
    }

    /// Replace the artifact info series
    pub fn set_artifact(&self, version: &str, classifier: &str) {
        if let Some(inner) = self.inner() {
            inner.artifact_info.reset();
            inner
                .artifact_info
                .with_label_values(&[version, classifier])
                .set(1);
        }
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, bind_addr: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            service_version = %version,
            bind_addr = %bind_addr,
            "Sleep disorder service started"
        );
    }

    pub fn log_artifact_loaded(&self, path: &str, version: &str, classifier: &str) {
        info!(
            event = "artifact_loaded",
            service = %self.service_name,
            path = %path,
            artifact_version = %version,
            classifier = %classifier,
            "Model artifact loaded"
        );
    }

    pub fn log_prediction(&self, label: SleepDisorder, elapsed: Duration, artifact_version: &str) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            prediction = %label,
            elapsed_us = elapsed.as_micros() as u64,
            artifact_version = %artifact_version,
            "Prediction served"
        );
    }

    /// Client errors log at info, internal faults at warn
    pub fn log_rejected(&self, kind: &str, message: &str, client_error: bool) {
        if client_error {
            info!(
                event = "prediction_rejected",
                service = %self.service_name,
                kind = %kind,
                message = %message,
                "Prediction request rejected"
            );
        } else {
            warn!(
                event = "prediction_rejected",
                service = %self.service_name,
                kind = %kind,
                message = %message,
                "Prediction failed"
            );
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Sleep disorder service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_recorded() {
        let metrics = ServiceMetrics::new();
        metrics.observe_prediction_latency(Duration::from_micros(250));
        metrics.inc_prediction(SleepDisorder::Insomnia);
        metrics.inc_request_error("validation_error");
        metrics.set_artifact("v1", "linear");

        let families = prometheus::gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"sleep_service_predictions_total"));
        assert!(names.contains(&"sleep_service_request_errors_total"));
        assert!(names.contains(&"sleep_service_artifact_info"));
    }

    #[test]
    fn test_handles_share_registration() {
        let first = ServiceMetrics::new();
        let second = first.clone();
        second.inc_prediction(SleepDisorder::NoneSleep);
        assert!(ServiceMetrics::new().inner().is_some());
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("sleep-service");
        assert_eq!(logger.service_name, "sleep-service");
    }
}
