//! Integration tests for the service API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use service_lib::{
    health::{components, HealthRegistry, UNHEALTHY_AFTER_FAULTS},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::{FeatureVector, InferenceError},
    DerivedFeatureSet, ModelArtifact, PredictionHandler, PredictionRequest, SleepPredictor,
};
use sleep_service::api::{create_router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

fn fixture_manifest() -> Value {
    json!({
        "version": "fixture-1",
        "pipeline": {
            "numeric": [
                {"column": "Sleep_Efficiency", "mean": 1.0, "scale": 0.25},
                {"column": "BP_Systolic", "mean": 128.0, "scale": 8.0},
                {"column": "Stress_Level", "mean": 5.4, "scale": 1.8}
            ],
            "categorical": [
                {"column": "BMI_Category", "categories": ["Normal", "Obese", "Overweight"]},
                {"column": "Age_Segment", "categories": ["Young", "Middle-aged", "Old", "Very Old"]}
            ]
        },
        "classifier": {
            "kind": "linear",
            "classes": [0, 1, 2],
            "coefficients": [
                [-1.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.5, 0.0, 1.0, 1.0, 0.0, 0.0, 0.5, 0.5],
                [1.0, 0.0, 1.0, 0.0, 0.0, 0.5, 0.0, 0.5, 0.0, 0.0]
            ],
            "intercepts": [0.2, 0.0, 0.0]
        }
    })
}

fn load_fixture() -> ModelArtifact {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifact.json");
    std::fs::write(&path, fixture_manifest().to_string()).unwrap();
    ModelArtifact::load(&path).unwrap()
}

/// Predictor whose classifier never produces an output
struct EmptyOutputPredictor;

impl SleepPredictor for EmptyOutputPredictor {
    fn transform(&self, _features: &DerivedFeatureSet) -> Result<FeatureVector, InferenceError> {
        Ok(FeatureVector::new(vec![0.0]))
    }

    fn predict(&self, _input: &FeatureVector) -> Result<i64, InferenceError> {
        Err(InferenceError::EmptyOutput)
    }

    fn version(&self) -> &str {
        "empty-output"
    }
}

async fn setup_app(loaded: bool) -> (Router, Arc<AppState>) {
    setup_app_with(Arc::new(load_fixture()), loaded).await
}

async fn setup_app_with(
    predictor: Arc<dyn SleepPredictor>,
    loaded: bool,
) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::PREDICT_HANDLER).await;
    if loaded {
        health_registry.artifact_loaded("fixture-1").await;
    }

    let state = Arc::new(AppState::new(
        PredictionHandler::new(predictor),
        health_registry,
        ServiceMetrics::new(),
        StructuredLogger::new("test-service"),
    ));
    (create_router(state.clone()), state)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_predict(router: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

fn example() -> Value {
    serde_json::to_value(PredictionRequest::example()).unwrap()
}

#[tokio::test]
async fn test_home_returns_welcome() {
    let (router, _) = setup_app(true).await;
    let (status, body) = get(router, "/").await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"message": "Welcome to the ML Model API!"}));
}

#[tokio::test]
async fn test_predict_returns_label() {
    let (router, _) = setup_app(true).await;
    let (status, body) = post_predict(router, example().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 1);
    let label = object["prediction"].as_str().unwrap();
    assert!(["None Sleep", "Sleep Apnea", "Insomnia"].contains(&label));
}

#[tokio::test]
async fn test_predict_is_idempotent() {
    let (router, _) = setup_app(true).await;
    let payload = example().to_string();

    let (_, first) = post_predict(router.clone(), payload.clone()).await;
    let (_, second) = post_predict(router, payload).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_empty_object_lists_every_field() {
    let (router, _) = setup_app(true).await;
    let (status, body) = post_predict(router, "{}").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 12);
    assert!(fields.iter().all(|f| f["kind"] == "missing"));
}

#[tokio::test]
async fn test_predict_empty_body_matches_empty_object() {
    let (router, _) = setup_app(true).await;
    let (status, body) = post_predict(router, Body::empty()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_predict_rejects_unknown_gender() {
    let (router, _) = setup_app(true).await;
    let mut payload = example();
    payload["Gender"] = json!("Other");
    let (status, body) = post_predict(router, payload.to_string()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["field"], "Gender");
    assert_eq!(fields[0]["kind"], "enum");
}

#[tokio::test]
async fn test_predict_rejects_malformed_blood_pressure() {
    let (router, _) = setup_app(true).await;
    let mut payload = example();
    payload["Blood_Pressure"] = json!("120-80");
    let (status, body) = post_predict(router, payload.to_string()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "parse_error");
    assert_eq!(body["fields"][0]["field"], "Blood_Pressure");
}

#[tokio::test]
async fn test_predict_rejects_zero_sleep_quality() {
    let (router, _) = setup_app(true).await;
    let mut payload = example();
    payload["Quality_of_Sleep"] = json!(0);
    let (status, body) = post_predict(router, payload.to_string()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "non_finite_feature");
    assert_eq!(body["fields"][0]["field"], "Quality_of_Sleep");
}

#[tokio::test]
async fn test_predict_accepts_unsegmented_age() {
    let (router, _) = setup_app(true).await;
    let mut payload = example();
    payload["Age"] = json!(22);
    let (status, _) = post_predict(router, payload.to_string()).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_healthz_reports_components() {
    let (router, _) = setup_app(true).await;
    let (status, body) = get(router, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["artifact_version"], "fixture-1");
    assert!(body["components"].get("artifact").is_some());
    assert!(body["components"].get("predict_handler").is_some());
}

#[tokio::test]
async fn test_healthz_degraded_still_ok() {
    let (router, state) = setup_app(true).await;
    state
        .health_registry
        .set_degraded(components::PREDICT_HANDLER, "classifier produced no output")
        .await;

    let (status, body) = get(router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_unhealthy_unavailable() {
    let (router, state) = setup_app(true).await;
    state
        .health_registry
        .set_unhealthy(components::ARTIFACT, "artifact unreadable")
        .await;

    let (status, _) = get(router, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_repeated_inference_faults_make_service_unhealthy() {
    let (router, _) = setup_app_with(Arc::new(EmptyOutputPredictor), true).await;

    for _ in 1..UNHEALTHY_AFTER_FAULTS {
        let (status, body) = post_predict(router.clone(), example().to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "inference_error");
    }
    let (status, body) = get(router.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "degraded");

    post_predict(router.clone(), example().to_string()).await;

    let (status, body) = get(router.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["components"]["predict_handler"]["status"], "unhealthy");

    let (status, _) = get(router, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_client_errors_leave_handler_healthy() {
    let (router, _) = setup_app_with(Arc::new(EmptyOutputPredictor), true).await;
    for _ in 0..UNHEALTHY_AFTER_FAULTS {
        let (status, _) = post_predict(router.clone(), "{}").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let (status, body) = get(router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readyz_before_and_after_load() {
    let (router, _) = setup_app(false).await;
    let (status, body) = get(router, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["ready"], false);

    let (router, _) = setup_app(true).await;
    let (status, _) = get(router, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_exposed_after_prediction() {
    let (router, _) = setup_app(true).await;
    post_predict(router.clone(), example().to_string()).await;
    post_predict(router.clone(), "{}").await;

    let (status, body) = get(router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("sleep_service_predictions_total"));
    assert!(text.contains("sleep_service_request_errors_total"));
    assert!(text.contains("sleep_service_prediction_latency_seconds"));
}

fn latency_samples() -> u64 {
    prometheus::gather()
        .iter()
        .find(|family| family.get_name() == "sleep_service_prediction_latency_seconds")
        .map(|family| family.get_metric()[0].get_histogram().get_sample_count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_latency_observed_for_rejected_requests() {
    let (router, _) = setup_app(true).await;
    let before = latency_samples();

    let (status, _) = post_predict(router.clone(), "{}").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = post_predict(router, Body::empty()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Other tests share the process-wide registry, so only a lower bound holds
    assert!(latency_samples() >= before + 2);
}
