//! Trained predictor adapter
//!
//! Wraps the artifact produced by the training pipeline: a fitted column
//! transformation followed by a classifier. The artifact is loaded once and
//! shared read-only between requests.

mod artifact;
mod classifier;
mod pipeline;

pub use artifact::{compute_checksum, ModelArtifact};
pub use classifier::{Classifier, LinearClassifier, OnnxClassifier};
pub use pipeline::{CategoricalColumn, FittedPipeline, NumericColumn};

use crate::features::DerivedFeatureSet;

/// Numeric model input produced by the fitted pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Failure to run the artifact against a feature set
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("pipeline expects column {0:?} which the derived features do not provide")]
    MissingColumn(String),

    #[error("pipeline expects column {column:?} to be {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("classifier expects {expected} input features, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("classifier produced no output")]
    EmptyOutput,

    #[error("classifier runtime failure: {0}")]
    Runtime(String),
}

/// Trait for the trained transformation + classification stages
pub trait SleepPredictor: Send + Sync {
    /// Encode derived features the way the artifact was fitted
    fn transform(&self, features: &DerivedFeatureSet) -> Result<FeatureVector, InferenceError>;

    /// Classify an encoded feature vector into a class code
    fn predict(&self, input: &FeatureVector) -> Result<i64, InferenceError>;

    /// Version string recorded in the artifact
    fn version(&self) -> &str;
}
