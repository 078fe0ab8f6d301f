//! Per-request prediction flow
//!
//! validate → derive → transform → predict → map. Each call is independent;
//! the only shared state is the read-only predictor.

use crate::features::{derive_features, ParseError};
use crate::labels::{MappingError, SleepDisorder};
use crate::models::PredictionResponse;
use crate::predictor::{InferenceError, SleepPredictor};
use crate::schema::{fields, FieldError, FieldErrorKind, PredictionRequest, ValidationError};
use std::sync::Arc;
use tracing::debug;

/// Any failure while serving a prediction
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("derived features are not finite: {}", .columns.join(", "))]
    NonFinite { columns: Vec<&'static str> },

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl PredictError {
    /// True when the caller's input caused the failure
    pub fn is_client_error(&self) -> bool {
        match self {
            PredictError::Validation(_) | PredictError::Parse(_) | PredictError::NonFinite { .. } => {
                true
            }
            PredictError::Inference(_) | PredictError::Mapping(_) => false,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "validation_error",
            PredictError::Parse(_) => "parse_error",
            PredictError::NonFinite { .. } => "non_finite_feature",
            PredictError::Inference(_) => "inference_error",
            PredictError::Mapping(_) => "mapping_error",
        }
    }

    /// Per-field detail for client errors; empty for internal faults
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            PredictError::Validation(e) => e.errors.clone(),
            PredictError::Parse(e) => vec![FieldError::new(
                fields::BLOOD_PRESSURE,
                FieldErrorKind::Format,
                e.to_string(),
            )],
            // Quality_of_Sleep is the only divisor in derivation
            PredictError::NonFinite { columns } => vec![FieldError::new(
                fields::QUALITY_OF_SLEEP,
                FieldErrorKind::NonFinite,
                format!("must be non-zero; {} would not be finite", columns.join(", ")),
            )],
            PredictError::Inference(_) | PredictError::Mapping(_) => Vec::new(),
        }
    }
}

/// Stateless request handler around a shared predictor
#[derive(Clone)]
pub struct PredictionHandler {
    predictor: Arc<dyn SleepPredictor>,
}

impl PredictionHandler {
    pub fn new(predictor: Arc<dyn SleepPredictor>) -> Self {
        Self { predictor }
    }

    pub fn predictor_version(&self) -> &str {
        self.predictor.version()
    }

    /// Serve a raw request body
    pub fn handle(&self, body: &[u8]) -> Result<PredictionResponse, PredictError> {
        let request = PredictionRequest::from_slice(body)?;
        self.predict(&request)
    }

    /// Serve an already validated request
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, PredictError> {
        let features = derive_features(request)?;

        let columns = features.non_finite_columns();
        if !columns.is_empty() {
            return Err(PredictError::NonFinite { columns });
        }

        let input = self.predictor.transform(&features)?;
        let code = self.predictor.predict(&input)?;
        let prediction = SleepDisorder::from_code(code)?;

        debug!(
            code,
            prediction = %prediction,
            version = %self.predictor.version(),
            "Prediction computed"
        );

        Ok(PredictionResponse { prediction })
    }
}
