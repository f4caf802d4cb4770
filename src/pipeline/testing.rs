//! Synthetic models and artifacts for tests. No real model files needed.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};
use serde_json::{json, Value};

use super::artifacts::{ANN_FILE, LABEL_ENCODER_FILE, META_FILE, SCALER_FILE, XGB_FILE};
use super::classifier::{check_input_width, Classifier};
use super::disease::{DiseaseClassifier, DiseaseTable, ImageModel};
use super::features::{FeatureNormalizer, FeatureVector, FEATURE_COUNT};
use super::labels::{plant_disease_encoder, LabelEncoder};
use super::preprocess::ImageTensor;
use super::stacking::{BaseModels, CropRecommender, StackingEnsemble};
use super::{ArtifactSet, PipelineError, ProbabilityVector};

/// Crop classes in label-encoder (sorted) order.
pub const CROP_CLASSES: [&str; 22] = [
    "apple",
    "banana",
    "blackgram",
    "chickpea",
    "coconut",
    "coffee",
    "cotton",
    "grapes",
    "jute",
    "kidneybeans",
    "lentil",
    "maize",
    "mango",
    "mothbeans",
    "mungbean",
    "muskmelon",
    "orange",
    "papaya",
    "pigeonpeas",
    "pomegranate",
    "rice",
    "watermelon",
];

const RICE: usize = 20;
const MAIZE: usize = 11;

const SCALER_MEAN: [f64; FEATURE_COUNT] = [50.55, 53.36, 48.15, 25.62, 71.48, 6.47, 103.46];
const SCALER_SCALE: [f64; FEATURE_COUNT] = [36.91, 32.98, 50.64, 5.06, 22.26, 0.77, 54.95];

pub fn crop_labels() -> LabelEncoder {
    LabelEncoder::new(CROP_CLASSES.iter().map(|s| s.to_string()).collect()).unwrap()
}

pub fn sample_features() -> FeatureVector {
    FeatureVector::new(90.0, 40.0, 40.0, 25.0, 80.0, 6.5, 200.0)
}

fn normalizer() -> FeatureNormalizer {
    FeatureNormalizer::Standard {
        mean: SCALER_MEAN.to_vec(),
        scale: SCALER_SCALE.to_vec(),
    }
}

/// `softmax(W·x + b)`, or a forced failure.
pub struct LinearClassifier {
    name: String,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    fail: bool,
}

impl LinearClassifier {
    /// Strongly favours `class`, with a little input dependence.
    pub fn peaked(name: &str, n_features: usize, n_classes: usize, class: usize) -> Self {
        let weights = (0..n_classes)
            .map(|c| {
                (0..n_features)
                    .map(|f| 0.001 * ((c + f) % 3) as f32)
                    .collect()
            })
            .collect();
        let mut bias = vec![0.0; n_classes];
        bias[class] = 6.0;
        Self {
            name: name.into(),
            weights,
            bias,
            fail: false,
        }
    }

    /// Class `c` reads input `offset + c` with a large weight.
    pub fn identity_like(name: &str, n_features: usize, n_classes: usize, offset: usize) -> Self {
        let weights = (0..n_classes)
            .map(|c| {
                (0..n_features)
                    .map(|f| if f == offset + c { 10.0 } else { 0.0 })
                    .collect()
            })
            .collect();
        Self {
            name: name.into(),
            weights,
            bias: vec![0.0; n_classes],
            fail: false,
        }
    }

    pub fn failing(name: &str, n_features: usize, n_classes: usize) -> Self {
        Self {
            fail: true,
            ..Self::identity_like(name, n_features, n_classes, 0)
        }
    }
}

impl Classifier for LinearClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        self.bias.len()
    }

    fn predict_proba(&self, features: &[f32]) -> Result<ProbabilityVector, PipelineError> {
        if self.fail {
            return Err(PipelineError::Inference(format!("{} exploded", self.name)));
        }
        check_input_width(self, features)?;
        let logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();
        ProbabilityVector::from_logits(&logits)
    }
}

/// XGB base favours rice, ANN base favours maize, meta reads only the first block.
pub fn stacked_recommender() -> CropRecommender {
    let c = CROP_CLASSES.len();
    let base = BaseModels {
        xgb: Box::new(LinearClassifier::peaked("xgb", FEATURE_COUNT, c, RICE)),
        ann: Box::new(LinearClassifier::peaked("ann", FEATURE_COUNT, c, MAIZE)),
    };
    let meta = Box::new(LinearClassifier::identity_like("meta", 2 * c, c, 0));
    let ensemble = StackingEnsemble::new(base, meta).unwrap();
    CropRecommender::new(normalizer(), crop_labels(), ensemble).unwrap()
}

// ═══════════════════════════════════════════════════════════
// On-disk artifacts in their real export formats
// ═══════════════════════════════════════════════════════════

fn stump(feature: usize, threshold: f32, left: f32, right: f32) -> Value {
    json!({
        "left_children": [1, -1, -1],
        "right_children": [2, -1, -1],
        "split_indices": [feature, 0, 0],
        "split_conditions": [threshold, left, right],
        "default_left": [1, 0, 0],
        "base_weights": [0.0, left, right]
    })
}

fn xgb_model(trees: Vec<Value>, tree_info: Vec<usize>, num_class: usize, num_feature: usize) -> Value {
    let num_trees = trees.len().to_string();
    json!({
        "learner": {
            "attributes": {},
            "feature_names": [],
            "feature_types": [],
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "gbtree_model_param": { "num_trees": num_trees },
                    "trees": trees,
                    "tree_info": tree_info
                }
            },
            "learner_model_param": {
                "base_score": "5E-1",
                "num_class": num_class.to_string(),
                "num_feature": num_feature.to_string()
            },
            "objective": { "name": "multi:softprob" }
        },
        "version": [2, 0, 3]
    })
}

/// Write scaler, encoder, ANN, XGB and meta-XGB exports into `dir`.
pub fn write_crop_artifacts(dir: &Path) {
    let c = CROP_CLASSES.len();
    let write = |file: &str, value: Value| {
        std::fs::write(dir.join(file), serde_json::to_vec_pretty(&value).unwrap()).unwrap();
    };

    write(
        SCALER_FILE,
        json!({ "kind": "standard", "mean": SCALER_MEAN, "scale": SCALER_SCALE }),
    );
    write(LABEL_ENCODER_FILE, json!({ "classes": CROP_CLASSES }));

    let hidden = 16;
    let kernel = |rows: usize, cols: usize, salt: usize| -> Vec<Vec<f32>> {
        (0..rows)
            .map(|i| {
                (0..cols)
                    .map(|j| ((i * 7 + j * 3 + salt) % 11) as f32 / 10.0 - 0.5)
                    .collect()
            })
            .collect()
    };
    write(
        ANN_FILE,
        json!({ "layers": [
            { "kind": "dense", "weights": kernel(FEATURE_COUNT, hidden, 1),
              "bias": vec![0.1f32; hidden], "activation": "relu" },
            { "kind": "dropout", "rate": 0.2 },
            { "kind": "dense", "weights": kernel(hidden, c, 4),
              "bias": vec![0.0f32; c], "activation": "softmax" }
        ]}),
    );

    let base_trees: Vec<Value> = (0..c)
        .map(|k| {
            let spread = 0.1 + 0.05 * (k % 4) as f32;
            stump(k % FEATURE_COUNT, (k % 5) as f32 * 0.4 - 0.8, -spread, spread)
        })
        .collect();
    write(XGB_FILE, xgb_model(base_trees, (0..c).collect(), c, FEATURE_COUNT));

    let mut meta_trees: Vec<Value> = (0..c).map(|k| stump(k, 0.05, -1.0, 2.0)).collect();
    meta_trees.extend((0..c).map(|k| stump(c + k, 0.05, -0.5, 1.0)));
    let meta_info: Vec<usize> = (0..c).chain(0..c).collect();
    write(META_FILE, xgb_model(meta_trees, meta_info, c, 2 * c));
}

// ═══════════════════════════════════════════════════════════
// Image path
// ═══════════════════════════════════════════════════════════

/// Returns the same distribution for every image, or fails.
pub struct FixedImageModel {
    n_classes: usize,
    probs: Option<Vec<f32>>,
}

impl FixedImageModel {
    pub fn peaked(n_classes: usize, class: usize) -> Self {
        let rest = 0.1 / (n_classes - 1) as f32;
        let probs = (0..n_classes)
            .map(|i| if i == class { 0.9 } else { rest })
            .collect();
        Self {
            n_classes,
            probs: Some(probs),
        }
    }

    pub fn failing(n_classes: usize) -> Self {
        Self {
            n_classes,
            probs: None,
        }
    }
}

impl ImageModel for FixedImageModel {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, image: &ImageTensor) -> Result<ProbabilityVector, PipelineError> {
        assert_eq!(image.shape(), [1, 128, 128, 3]);
        match &self.probs {
            Some(p) => ProbabilityVector::new(p.clone()),
            None => Err(PipelineError::Inference("model exploded".into())),
        }
    }
}

pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, image::Rgb(color))
}

pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// The bundled reference table shipped in `data/`.
pub fn disease_table() -> DiseaseTable {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/disease_info.json");
    DiseaseTable::load(&path).unwrap()
}

/// Crop fixtures plus an image model that always predicts `disease_class`.
pub fn test_artifacts(disease_class: usize) -> ArtifactSet {
    let disease = DiseaseClassifier::new(
        Box::new(FixedImageModel::peaked(38, disease_class)),
        plant_disease_encoder(),
    )
    .unwrap();
    ArtifactSet::from_parts(stacked_recommender(), disease)
}
