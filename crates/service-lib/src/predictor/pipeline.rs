//! Fitted column transformation
//!
//! Mirrors the preprocessing the classifier was trained behind: numeric
//! columns are standardised, categorical columns are one-hot encoded, and
//! any column the pipeline does not name is dropped. Output layout is all
//! numeric columns in order followed by each one-hot block in order.

use super::{FeatureVector, InferenceError};
use crate::features::{DerivedFeatureSet, FeatureValue};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Standardisation parameters for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

impl NumericColumn {
    fn encode(&self, value: f64) -> f32 {
        // Zero-variance columns are fitted with scale 0 and pass through centred
        let scale = if self.scale == 0.0 { 1.0 } else { self.scale };
        ((value - self.mean) / scale) as f32
    }
}

/// One-hot vocabulary for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub column: String,
    pub categories: Vec<String>,
    /// Category substituted when the value is unassigned
    #[serde(default)]
    pub impute: Option<String>,
}

impl CategoricalColumn {
    fn encode(&self, value: Option<&str>, out: &mut Vec<f32>) {
        let value = value.or(self.impute.as_deref());
        out.extend(
            self.categories
                .iter()
                .map(|c| if Some(c.as_str()) == value { 1.0 } else { 0.0 }),
        );
    }
}

/// Fitted transformation stage of the artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    #[serde(default)]
    pub numeric: Vec<NumericColumn>,
    #[serde(default)]
    pub categorical: Vec<CategoricalColumn>,
}

impl FittedPipeline {
    /// Width of the vector produced by [`FittedPipeline::transform`]
    pub fn output_width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Check the fitted parameters against the columns derivation produces
    pub fn validate(&self, available: &[&str]) -> Result<()> {
        if self.output_width() == 0 {
            bail!("pipeline produces no features");
        }
        for n in &self.numeric {
            if !available.contains(&n.column.as_str()) {
                bail!("numeric column {:?} is not produced by feature derivation", n.column);
            }
            if !n.mean.is_finite() || !n.scale.is_finite() {
                bail!("numeric column {:?} has non-finite parameters", n.column);
            }
        }
        for c in &self.categorical {
            if !available.contains(&c.column.as_str()) {
                bail!("categorical column {:?} is not produced by feature derivation", c.column);
            }
            if c.categories.is_empty() {
                bail!("categorical column {:?} has no categories", c.column);
            }
            if let Some(impute) = &c.impute {
                if !c.categories.contains(impute) {
                    bail!(
                        "categorical column {:?} imputes unknown category {:?}",
                        c.column,
                        impute
                    );
                }
            }
        }
        Ok(())
    }

    /// Encode a derived feature set into the classifier's input vector
    pub fn transform(&self, features: &DerivedFeatureSet) -> Result<FeatureVector, InferenceError> {
        let mut values = Vec::with_capacity(self.output_width());

        for n in &self.numeric {
            match features.column(&n.column) {
                Some(FeatureValue::Numeric(v)) => values.push(n.encode(v)),
                Some(FeatureValue::Categorical(_)) => {
                    return Err(InferenceError::ColumnType {
                        column: n.column.clone(),
                        expected: "numeric",
                    })
                }
                None => return Err(InferenceError::MissingColumn(n.column.clone())),
            }
        }

        for c in &self.categorical {
            match features.column(&c.column) {
                Some(FeatureValue::Categorical(v)) => c.encode(v, &mut values),
                Some(FeatureValue::Numeric(_)) => {
                    return Err(InferenceError::ColumnType {
                        column: c.column.clone(),
                        expected: "categorical",
                    })
                }
                None => return Err(InferenceError::MissingColumn(c.column.clone())),
            }
        }

        Ok(FeatureVector::new(values))
    }
}
