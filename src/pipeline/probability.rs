//! Class-probability vectors and the stacked meta-feature vector.

use super::PipelineError;

/// Allowed drift of a probability vector's sum from 1.0 (float32 softmax output).
pub const SUM_TOLERANCE: f32 = 1e-3;

/// Non-negative, finite class probabilities that sum to 1 (within `SUM_TOLERANCE`).
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<f32>);

impl ProbabilityVector {
    pub fn new(values: Vec<f32>) -> Result<Self, PipelineError> {
        if values.is_empty() {
            return Err(PipelineError::Inference("empty probability vector".into()));
        }
        if let Some((i, v)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(PipelineError::Inference(format!(
                "probability[{i}] = {v} is not a valid probability"
            )));
        }
        let sum: f32 = values.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(PipelineError::Inference(format!(
                "probabilities sum to {sum}, expected 1"
            )));
        }
        Ok(Self(values))
    }

    /// Numerically stable softmax over raw margins.
    pub fn from_logits(logits: &[f32]) -> Result<Self, PipelineError> {
        Self::new(softmax(logits))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index and value of the most probable class. First index wins on ties.
    pub fn argmax(&self) -> (usize, f32) {
        let mut best = (0, self.0[0]);
        for (i, &p) in self.0.iter().enumerate().skip(1) {
            if p > best.1 {
                best = (i, p);
            }
        }
        best
    }
}

/// Concatenated base-model probabilities, the meta-combiner's only input.
///
/// The layout is positional; `StackingEnsemble` is the only producer and
/// always concatenates in `BASE_MODEL_ORDER`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaFeatureVector(Vec<f32>);

impl MetaFeatureVector {
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a ProbabilityVector>) -> Self {
        let mut values = Vec::new();
        for part in parts {
            values.extend_from_slice(part.as_slice());
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub(crate) fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}
