//! Artifact loading
//!
//! The artifact is a JSON manifest holding the fitted pipeline and a
//! classifier description. ONNX classifiers live in a sibling file that is
//! read, checksum-validated and optimized together with the manifest.

use super::classifier::{Classifier, LinearClassifier, OnnxClassifier};
use super::pipeline::FittedPipeline;
use super::{FeatureVector, InferenceError, SleepPredictor};
use crate::features::DerivedFeatureSet;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ClassifierSpec {
    Onnx {
        path: PathBuf,
        #[serde(default)]
        sha256: Option<String>,
        #[serde(default)]
        classes: Option<Vec<i64>>,
    },
    Linear(LinearClassifier),
}

#[derive(Debug, Deserialize)]
struct ArtifactManifest {
    version: String,
    pipeline: FittedPipeline,
    classifier: ClassifierSpec,
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Loaded, immutable predictor artifact
pub struct ModelArtifact {
    version: String,
    pipeline: FittedPipeline,
    classifier: Classifier,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("version", &self.version)
            .field("classifier", &self.classifier.kind())
            .field("input_width", &self.input_width())
            .finish()
    }
}

impl ModelArtifact {
    /// Load an artifact manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        let manifest = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact manifest {:?}", path))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let artifact = Self::from_manifest_str(&manifest, base_dir)
            .with_context(|| format!("Invalid artifact manifest {:?}", path))?;

        debug!(
            path = %path.display(),
            input_width = artifact.input_width(),
            "Artifact manifest parsed"
        );
        Ok(artifact)
    }

    /// Build an artifact from manifest JSON; relative paths resolve against `base_dir`
    pub fn from_manifest_str(manifest: &str, base_dir: &Path) -> Result<Self> {
        let manifest: ArtifactManifest =
            serde_json::from_str(manifest).context("Failed to parse artifact manifest")?;

        manifest
            .pipeline
            .validate(&DerivedFeatureSet::COLUMN_NAMES)?;
        let width = manifest.pipeline.output_width();

        let classifier = match manifest.classifier {
            ClassifierSpec::Linear(linear) => {
                linear.validate(width)?;
                Classifier::Linear(linear)
            }
            ClassifierSpec::Onnx {
                path,
                sha256,
                classes,
            } => {
                let model_path = if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                };
                let bytes = std::fs::read(&model_path)
                    .with_context(|| format!("Failed to read ONNX classifier {:?}", model_path))?;

                if let Some(expected) = sha256 {
                    let computed = compute_checksum(&bytes);
                    if !computed.eq_ignore_ascii_case(expected.trim()) {
                        bail!(
                            "Checksum mismatch for {:?}: expected {}, got {}",
                            model_path,
                            expected,
                            computed
                        );
                    }
                    debug!(checksum = %computed, "Classifier checksum validated");
                }

                Classifier::Onnx(OnnxClassifier::new(&bytes, width, classes)?)
            }
        };

        Ok(Self {
            version: manifest.version,
            pipeline: manifest.pipeline,
            classifier,
        })
    }

    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn input_width(&self) -> usize {
        self.pipeline.output_width()
    }
}

impl SleepPredictor for ModelArtifact {
    fn transform(&self, features: &DerivedFeatureSet) -> Result<FeatureVector, InferenceError> {
        self.pipeline.transform(features)
    }

    fn predict(&self, input: &FeatureVector) -> Result<i64, InferenceError> {
        let expected = self.input_width();
        if input.len() != expected {
            return Err(InferenceError::WidthMismatch {
                expected,
                actual: input.len(),
            });
        }
        self.classifier.classify(input)
    }

    fn version(&self) -> &str {
        &self.version
    }
}
