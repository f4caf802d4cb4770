//! Inference core: crop stacking ensemble and leaf-image disease classifier.
//!
//! Crop path: FeatureVector → normalizer → base models (in `BASE_MODEL_ORDER`)
//! → concatenated meta-features → meta-combiner → top-K ranking.
//! Image path: upload bytes → 128×128 RGB tensor → CNN → argmax → disease table.

pub mod artifacts;
pub mod classifier;
pub mod disease;
pub mod features;
pub mod labels;
pub mod neural_net;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocess;
pub mod probability;
pub mod ranking;
pub mod stacking;
pub mod tree_ensemble;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{load_crop, ArtifactSet};
pub use classifier::Classifier;
pub use disease::{
    DiseaseClassifier, DiseaseDiagnosis, DiseaseRecord, DiseaseTable, ImageModel, Severity,
};
pub use features::{FeatureNormalizer, FeatureVector, NormalizedFeatureVector, FEATURE_COUNT};
pub use labels::{LabelEncoder, PLANT_DISEASE_CLASSES};
pub use probability::{MetaFeatureVector, ProbabilityVector};
pub use ranking::{top_k, RankedResult};
pub use stacking::{BaseModelKind, CropRecommender, StackingEnsemble, BASE_MODEL_ORDER};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    #[error("Artifact {path} is corrupt: {reason}")]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl PipelineError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
