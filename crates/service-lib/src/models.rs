//! Wire models for the prediction API

use crate::handler::PredictError;
use crate::labels::SleepDisorder;
use crate::schema::FieldError;
use serde::{Deserialize, Serialize};

/// Greeting returned by the root endpoint
pub const WELCOME_MESSAGE: &str = "Welcome to the ML Model API!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

impl Default for WelcomeResponse {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}

/// Successful prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: SleepDisorder,
}

/// Error payload for a failed prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl From<&PredictError> for ErrorResponse {
    fn from(err: &PredictError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
            fields: err.field_errors(),
        }
    }
}
