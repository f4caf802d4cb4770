//! Shared capability of every tabular model in the crop pipeline.

use super::{PipelineError, ProbabilityVector};

/// "Feature vector in, probability vector out."
///
/// Implemented by `NeuralNetClassifier` and `TreeEnsembleClassifier`, so the
/// stacking code is written once against `dyn Classifier` regardless of which
/// library originally produced the model.
pub trait Classifier: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    fn predict_proba(&self, features: &[f32]) -> Result<ProbabilityVector, PipelineError>;
}

/// Reject inputs whose width differs from what the model was trained on.
pub(crate) fn check_input_width(
    model: &dyn Classifier,
    features: &[f32],
) -> Result<(), PipelineError> {
    if features.len() != model.n_features() {
        return Err(PipelineError::Inference(format!(
            "{} expects {} inputs, got {}",
            model.name(),
            model.n_features(),
            features.len()
        )));
    }
    Ok(())
}

/// Reject outputs whose class count differs from the declared one.
pub(crate) fn check_output_width(
    model: &dyn Classifier,
    probs: &ProbabilityVector,
) -> Result<(), PipelineError> {
    if probs.len() != model.n_classes() {
        return Err(PipelineError::Inference(format!(
            "{} produced {} probabilities, expected {}",
            model.name(),
            probs.len(),
            model.n_classes()
        )));
    }
    Ok(())
}
