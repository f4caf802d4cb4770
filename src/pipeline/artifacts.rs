//! Read-only loader for the pre-trained artifact directory.
//!
//! Either every artifact loads and validates, or loading fails; no partially
//! loaded set is ever handed out.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::info;

use super::disease::{DiseaseClassifier, ImageModel};
use super::features::FeatureNormalizer;
use super::labels::{plant_disease_encoder, LabelEncoder};
use super::neural_net::{NeuralNetClassifier, NeuralNetExport};
use super::stacking::{BaseModels, CropRecommender, StackingEnsemble};
use super::tree_ensemble::{TreeEnsembleClassifier, XgbModel};
use super::PipelineError;

pub const SCALER_FILE: &str = "scaler.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const ANN_FILE: &str = "crop_ann.json";
pub const XGB_FILE: &str = "crop_xgb.json";
pub const META_FILE: &str = "stack_meta_xgb.json";
pub const IMAGE_MODEL_FILE: &str = "plant_disease.onnx";

const CROP_FILES: [&str; 5] = [SCALER_FILE, LABEL_ENCODER_FILE, ANN_FILE, XGB_FILE, META_FILE];

/// Everything inference needs, built once and shared read-only.
pub struct ArtifactSet {
    pub crop: CropRecommender,
    pub disease: DiseaseClassifier,
}

impl ArtifactSet {
    pub fn from_parts(crop: CropRecommender, disease: DiseaseClassifier) -> Self {
        Self { crop, disease }
    }

    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let started = Instant::now();
        ensure_present(dir, &CROP_FILES)?;
        ensure_present(dir, &[IMAGE_MODEL_FILE])?;

        let crop = load_crop(dir)?;
        let image_path = dir.join(IMAGE_MODEL_FILE);
        let model = load_image_model(&image_path)?;
        let disease = DiseaseClassifier::new(model, plant_disease_encoder())
            .map_err(|reason| PipelineError::corrupt(&image_path, reason))?;

        info!(
            dir = %dir.display(),
            crop_classes = crop.labels().len(),
            disease_classes = disease.labels().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "artifacts loaded"
        );
        Ok(Self { crop, disease })
    }
}

/// Load normalizer, label encoder, both base models and the meta model.
pub fn load_crop(dir: &Path) -> Result<CropRecommender, PipelineError> {
    ensure_present(dir, &CROP_FILES)?;

    let scaler_path = dir.join(SCALER_FILE);
    let normalizer: FeatureNormalizer = read_json(&scaler_path)?;
    normalizer
        .validate()
        .map_err(|reason| PipelineError::corrupt(&scaler_path, reason))?;

    let encoder_path = dir.join(LABEL_ENCODER_FILE);
    let labels: LabelEncoder = read_json(&encoder_path)?;
    labels
        .validate()
        .map_err(|reason| PipelineError::corrupt(&encoder_path, reason))?;

    let ann_path = dir.join(ANN_FILE);
    let ann_export: NeuralNetExport = read_json(&ann_path)?;
    let ann = NeuralNetClassifier::from_export("ann", ann_export)
        .map_err(|reason| PipelineError::corrupt(&ann_path, reason))?;

    let xgb_path = dir.join(XGB_FILE);
    let xgb_export: XgbModel = read_json(&xgb_path)?;
    let xgb = TreeEnsembleClassifier::from_export("xgb", xgb_export)
        .map_err(|reason| PipelineError::corrupt(&xgb_path, reason))?;

    let meta_path = dir.join(META_FILE);
    let meta_export: XgbModel = read_json(&meta_path)?;
    let meta = TreeEnsembleClassifier::from_export("meta", meta_export)
        .map_err(|reason| PipelineError::corrupt(&meta_path, reason))?;

    let base = BaseModels {
        xgb: Box::new(xgb),
        ann: Box::new(ann),
    };
    let ensemble = StackingEnsemble::new(base, Box::new(meta))
        .map_err(|reason| PipelineError::corrupt(&meta_path, reason))?;

    CropRecommender::new(normalizer, labels, ensemble)
        .map_err(|reason| PipelineError::corrupt(&encoder_path, reason))
}

#[cfg(feature = "onnx")]
fn load_image_model(path: &Path) -> Result<Box<dyn ImageModel>, PipelineError> {
    let model = super::onnx::OnnxImageModel::load(path, plant_disease_encoder().len())?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load_image_model(path: &Path) -> Result<Box<dyn ImageModel>, PipelineError> {
    Err(PipelineError::corrupt(
        path,
        "ONNX image models need a build with the `onnx` feature",
    ))
}

fn ensure_present(dir: &Path, files: &[&str]) -> Result<(), PipelineError> {
    for file in files {
        let path = dir.join(file);
        if !path.is_file() {
            return Err(PipelineError::ArtifactMissing(path));
        }
    }
    Ok(())
}

/// Read and deserialize a JSON artifact, classifying failures.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PipelineError::ArtifactMissing(path.to_path_buf()))
        }
        Err(e) => return Err(PipelineError::corrupt(path, e.to_string())),
    };
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::corrupt(path, e.to_string()))
}
