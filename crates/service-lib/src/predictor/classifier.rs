//! Classification stage of the artifact
//!
//! ONNX classifiers run through tract; linear classifiers carry their
//! weights inline in the artifact manifest.

use super::{FeatureVector, InferenceError};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Index of the highest score; ties resolve to the first
fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
            Some((_, b)) if b.total_cmp(&s).is_ge() => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

/// Resolve a score index to a class code
fn class_at(classes: Option<&[i64]>, idx: usize) -> Result<i64, InferenceError> {
    match classes {
        Some(classes) => classes.get(idx).copied().ok_or_else(|| {
            InferenceError::Runtime(format!(
                "score index {} has no class among {} classes",
                idx,
                classes.len()
            ))
        }),
        None => Ok(idx as i64),
    }
}

/// Multinomial linear model: `argmax(W·x + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// Class code per coefficient row; defaults to the row index
    #[serde(default)]
    pub classes: Option<Vec<i64>>,
    pub coefficients: Vec<Vec<f32>>,
    pub intercepts: Vec<f32>,
}

impl LinearClassifier {
    /// Check weight shapes against the pipeline output width
    pub fn validate(&self, width: usize) -> Result<()> {
        if self.coefficients.is_empty() {
            bail!("linear classifier has no classes");
        }
        if self.intercepts.len() != self.coefficients.len() {
            bail!(
                "linear classifier has {} intercepts for {} coefficient rows",
                self.intercepts.len(),
                self.coefficients.len()
            );
        }
        if let Some(classes) = &self.classes {
            if classes.len() != self.coefficients.len() {
                bail!(
                    "linear classifier lists {} classes for {} coefficient rows",
                    classes.len(),
                    self.coefficients.len()
                );
            }
        }
        if let Some(row) = self.coefficients.iter().position(|r| r.len() != width) {
            bail!(
                "coefficient row {} has {} weights, pipeline produces {}",
                row,
                self.coefficients[row].len(),
                width
            );
        }
        Ok(())
    }

    pub fn scores(&self, input: &FeatureVector) -> Vec<f32> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(input.values()).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }

    fn classify(&self, input: &FeatureVector) -> Result<i64, InferenceError> {
        let idx = argmax(&self.scores(input)).ok_or(InferenceError::EmptyOutput)?;
        class_at(self.classes.as_deref(), idx)
    }
}

/// ONNX classifier executed with tract
pub struct OnnxClassifier {
    model: TractModel,
    width: usize,
    classes: Option<Vec<i64>>,
}

impl OnnxClassifier {
    /// Parse and optimize an ONNX model taking `f32[1, width]`
    pub fn new(model_bytes: &[u8], width: usize, classes: Option<Vec<i64>>) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self {
            model,
            width,
            classes,
        })
    }

    fn classify(&self, input: &FeatureVector) -> Result<i64, InferenceError> {
        let tensor: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.width), input.values().to_vec())
                .map_err(|e| InferenceError::Runtime(e.to_string()))?
                .into();

        let result = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let output = result.first().ok_or(InferenceError::EmptyOutput)?;

        // Tree ensembles export the label first; plain graphs export scores
        match output.datum_type() {
            DatumType::I64 => output
                .to_array_view::<i64>()
                .map_err(|e| InferenceError::Runtime(e.to_string()))?
                .iter()
                .next()
                .copied()
                .ok_or(InferenceError::EmptyOutput),
            DatumType::F32 => {
                let scores: Vec<f32> = output
                    .to_array_view::<f32>()
                    .map_err(|e| InferenceError::Runtime(e.to_string()))?
                    .iter()
                    .copied()
                    .collect();
                let idx = argmax(&scores).ok_or(InferenceError::EmptyOutput)?;
                class_at(self.classes.as_deref(), idx)
            }
            other => Err(InferenceError::Runtime(format!(
                "unsupported classifier output type {:?}",
                other
            ))),
        }
    }
}

/// Classification stage, selected by the artifact manifest
pub enum Classifier {
    Linear(LinearClassifier),
    Onnx(OnnxClassifier),
}

impl Classifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::Linear(_) => "linear",
            Classifier::Onnx(_) => "onnx",
        }
    }

    /// Classify an encoded vector whose width was checked by the caller
    pub fn classify(&self, input: &FeatureVector) -> Result<i64, InferenceError> {
        let start = Instant::now();

        let code = match self {
            Classifier::Linear(linear) => linear.classify(input),
            Classifier::Onnx(onnx) => onnx.classify(input),
        }?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                classifier = self.kind(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), code, "Inference completed");
        }

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> LinearClassifier {
        LinearClassifier {
            classes: None,
            coefficients: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            intercepts: vec![0.0, 0.0, 0.5],
        }
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_linear_scores() {
        let scores = linear().scores(&FeatureVector::new(vec![2.0, 1.0]));
        assert_eq!(scores, vec![2.0, 1.0, -2.5]);
    }

    #[test]
    fn test_linear_classify() {
        let classifier = Classifier::Linear(linear());
        assert_eq!(classifier.classify(&FeatureVector::new(vec![2.0, 1.0])), Ok(0));
        assert_eq!(classifier.classify(&FeatureVector::new(vec![0.0, 3.0])), Ok(1));
        assert_eq!(classifier.classify(&FeatureVector::new(vec![-1.0, -1.0])), Ok(2));
        assert_eq!(classifier.kind(), "linear");
    }

    #[test]
    fn test_linear_explicit_classes() {
        let mut model = linear();
        model.classes = Some(vec![2, 0, 7]);
        let classifier = Classifier::Linear(model);
        assert_eq!(classifier.classify(&FeatureVector::new(vec![2.0, 1.0])), Ok(2));
        assert_eq!(classifier.classify(&FeatureVector::new(vec![-1.0, -1.0])), Ok(7));
    }

    #[test]
    fn test_linear_validate() {
        assert!(linear().validate(2).is_ok());
        assert!(linear().validate(3).is_err());

        let mut model = linear();
        model.intercepts.pop();
        assert!(model.validate(2).is_err());

        let mut model = linear();
        model.classes = Some(vec![0, 1]);
        assert!(model.validate(2).is_err());
    }

    const SCORES_ONNX: &[u8] = include_bytes!("fixtures/scores.onnx");
    const LABEL_ONNX: &[u8] = include_bytes!("fixtures/label.onnx");
    const LABEL_I32_ONNX: &[u8] = include_bytes!("fixtures/label_i32.onnx");

    // The fixtures hold the weights of `linear()` as a Gemm, optionally followed by ArgMax
    fn inputs() -> Vec<FeatureVector> {
        vec![
            FeatureVector::new(vec![2.0, 1.0]),
            FeatureVector::new(vec![0.0, 3.0]),
            FeatureVector::new(vec![-1.0, -1.0]),
        ]
    }

    #[test]
    fn test_onnx_score_output() {
        let classifier = Classifier::Onnx(OnnxClassifier::new(SCORES_ONNX, 2, None).unwrap());
        assert_eq!(classifier.kind(), "onnx");

        let codes: Vec<_> = inputs().iter().map(|x| classifier.classify(x)).collect();
        assert_eq!(codes, vec![Ok(0), Ok(1), Ok(2)]);
    }

    #[test]
    fn test_onnx_score_output_matches_linear() {
        let onnx = Classifier::Onnx(OnnxClassifier::new(SCORES_ONNX, 2, None).unwrap());
        let linear = Classifier::Linear(linear());
        for x in [vec![0.3, -0.2], vec![-4.0, 1.5], vec![1.0, 1.0]] {
            let x = FeatureVector::new(x);
            assert_eq!(onnx.classify(&x), linear.classify(&x));
        }
    }

    #[test]
    fn test_onnx_score_output_explicit_classes() {
        let classifier =
            Classifier::Onnx(OnnxClassifier::new(SCORES_ONNX, 2, Some(vec![2, 0, 7])).unwrap());
        let codes: Vec<_> = inputs().iter().map(|x| classifier.classify(x)).collect();
        assert_eq!(codes, vec![Ok(2), Ok(0), Ok(7)]);
    }

    #[test]
    fn test_onnx_score_index_without_class() {
        let classifier =
            Classifier::Onnx(OnnxClassifier::new(SCORES_ONNX, 2, Some(vec![0, 1])).unwrap());
        assert_eq!(classifier.classify(&inputs()[0]), Ok(0));
        assert!(matches!(
            classifier.classify(&inputs()[2]),
            Err(InferenceError::Runtime(_))
        ));
    }

    #[test]
    fn test_onnx_label_output() {
        // Labels are returned as-is; `classes` only applies to score outputs
        let classifier =
            Classifier::Onnx(OnnxClassifier::new(LABEL_ONNX, 2, Some(vec![2, 0, 7])).unwrap());
        let codes: Vec<_> = inputs().iter().map(|x| classifier.classify(x)).collect();
        assert_eq!(codes, vec![Ok(0), Ok(1), Ok(2)]);
    }

    #[test]
    fn test_onnx_unsupported_output_type() {
        let classifier = Classifier::Onnx(OnnxClassifier::new(LABEL_I32_ONNX, 2, None).unwrap());
        match classifier.classify(&inputs()[0]) {
            Err(InferenceError::Runtime(msg)) => assert!(msg.contains("unsupported")),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_onnx_width_mismatch_rejected() {
        assert!(OnnxClassifier::new(SCORES_ONNX, 3, None).is_err());
    }

    #[test]
    fn test_invalid_onnx_bytes_rejected() {
        assert!(OnnxClassifier::new(b"not an onnx model", 4, None).is_err());
    }
}
