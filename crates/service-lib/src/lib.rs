//! Core library for sleep disorder prediction
//!
//! This crate provides:
//! - Request schema and validation
//! - Feature derivation
//! - The trained predictor adapter
//! - Label mapping and the per-request handler
//! - Health checks and observability

pub mod features;
pub mod handler;
pub mod health;
pub mod labels;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;

pub use features::{derive_features, DerivedFeatureSet};
pub use handler::{PredictError, PredictionHandler};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use labels::SleepDisorder;
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{ModelArtifact, SleepPredictor};
pub use schema::PredictionRequest;
