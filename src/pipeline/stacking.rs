//! Two-stage stacking ensemble for crop recommendation.
//!
//! Stage one runs both base models on the same normalized features. Their
//! probability vectors are concatenated in `BASE_MODEL_ORDER` and fed to the
//! meta-combiner. The concatenation is positional and not self-describing, so
//! the order is pinned here and nowhere else.

use std::time::Instant;

use tracing::debug;

use super::classifier::Classifier;
use super::features::{FeatureNormalizer, FeatureVector, NormalizedFeatureVector, FEATURE_COUNT};
use super::labels::LabelEncoder;
use super::probability::{MetaFeatureVector, ProbabilityVector};
use super::ranking::{top_k, RankedResult};
use super::PipelineError;

/// Which first-stage model produced a probability vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseModelKind {
    /// Gradient-boosted trees.
    Xgb,
    /// Dense neural network.
    Ann,
}

impl BaseModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BaseModelKind::Xgb => "xgb",
            BaseModelKind::Ann => "ann",
        }
    }
}

/// Meta-feature layout the meta-combiner was trained on: XGB block, then ANN block.
pub const BASE_MODEL_ORDER: [BaseModelKind; 2] = [BaseModelKind::Xgb, BaseModelKind::Ann];

/// The two first-stage models, addressed by kind rather than position.
pub struct BaseModels {
    pub xgb: Box<dyn Classifier>,
    pub ann: Box<dyn Classifier>,
}

impl BaseModels {
    pub fn get(&self, kind: BaseModelKind) -> &dyn Classifier {
        match kind {
            BaseModelKind::Xgb => self.xgb.as_ref(),
            BaseModelKind::Ann => self.ann.as_ref(),
        }
    }
}

pub struct StackingEnsemble {
    base: BaseModels,
    meta: Box<dyn Classifier>,
    n_classes: usize,
}

impl StackingEnsemble {
    /// Check that every model agrees on the class count and that the meta
    /// model's input width equals `BASE_MODEL_ORDER.len() × C`.
    pub fn new(base: BaseModels, meta: Box<dyn Classifier>) -> Result<Self, String> {
        let n_classes = meta.n_classes();
        for kind in BASE_MODEL_ORDER {
            let model = base.get(kind);
            if model.n_classes() != n_classes {
                return Err(format!(
                    "{} base model has {} classes, meta model has {n_classes}",
                    kind.as_str(),
                    model.n_classes()
                ));
            }
            if model.n_features() != FEATURE_COUNT {
                return Err(format!(
                    "{} base model expects {} features, pipeline provides {FEATURE_COUNT}",
                    kind.as_str(),
                    model.n_features()
                ));
            }
        }
        let expected_width = BASE_MODEL_ORDER.len() * n_classes;
        if meta.n_features() != expected_width {
            return Err(format!(
                "meta model expects {} inputs, stacking produces {expected_width}",
                meta.n_features()
            ));
        }
        Ok(Self {
            base,
            meta,
            n_classes,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Run every base model; any failure fails the whole request.
    pub fn base_probabilities(
        &self,
        features: &NormalizedFeatureVector,
    ) -> Result<Vec<(BaseModelKind, ProbabilityVector)>, PipelineError> {
        BASE_MODEL_ORDER
            .iter()
            .map(|&kind| {
                let probs = self.base.get(kind).predict_proba(features.as_slice())?;
                Ok((kind, probs))
            })
            .collect()
    }

    pub fn meta_features(
        &self,
        features: &NormalizedFeatureVector,
    ) -> Result<MetaFeatureVector, PipelineError> {
        let base = self.base_probabilities(features)?;
        Ok(MetaFeatureVector::concat(base.iter().map(|(_, p)| p)))
    }

    pub fn combine(&self, meta: &MetaFeatureVector) -> Result<ProbabilityVector, PipelineError> {
        let expected = BASE_MODEL_ORDER.len() * self.n_classes;
        if meta.len() != expected {
            return Err(PipelineError::Inference(format!(
                "meta-feature width {} does not match {expected}",
                meta.len()
            )));
        }
        self.meta.predict_proba(meta.as_slice())
    }

    pub fn predict_proba(
        &self,
        features: &NormalizedFeatureVector,
    ) -> Result<ProbabilityVector, PipelineError> {
        let meta = self.meta_features(features)?;
        self.combine(&meta)
    }
}

/// Normalizer + label encoder + stacking ensemble: the complete crop path.
pub struct CropRecommender {
    normalizer: FeatureNormalizer,
    labels: LabelEncoder,
    ensemble: StackingEnsemble,
}

impl CropRecommender {
    pub fn new(
        normalizer: FeatureNormalizer,
        labels: LabelEncoder,
        ensemble: StackingEnsemble,
    ) -> Result<Self, String> {
        normalizer.validate()?;
        labels.validate()?;
        if labels.len() != ensemble.n_classes() {
            return Err(format!(
                "label encoder has {} classes, models have {}",
                labels.len(),
                ensemble.n_classes()
            ));
        }
        Ok(Self {
            normalizer,
            labels,
            ensemble,
        })
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    pub fn ensemble(&self) -> &StackingEnsemble {
        &self.ensemble
    }

    /// Top-`k` crops for one set of measurements.
    pub fn recommend(
        &self,
        features: &FeatureVector,
        k: i64,
    ) -> Result<Vec<RankedResult>, PipelineError> {
        let started = Instant::now();
        let normalized = self.normalizer.normalize(features);
        let probs = self.ensemble.predict_proba(&normalized)?;
        let ranked = top_k(&probs, k, &self.labels)?;
        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            top = ranked.first().map(|r| r.label.as_str()).unwrap_or(""),
            "crop recommendation"
        );
        Ok(ranked)
    }
}
