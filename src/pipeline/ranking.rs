//! Top-K selection over a probability vector.

use serde::Serialize;

use super::labels::LabelEncoder;
use super::probability::ProbabilityVector;
use super::PipelineError;

/// Decimal places kept in reported confidences.
pub const CONFIDENCE_DECIMALS: i32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub label: String,
    pub confidence: f64,
}

/// Round to `CONFIDENCE_DECIMALS` places for display stability.
pub fn round_confidence(p: f32) -> f64 {
    let factor = 10f64.powi(CONFIDENCE_DECIMALS);
    ((p as f64) * factor).round() / factor
}

/// The `min(k, C)` most probable classes, descending.
///
/// The sort is stable, so exact ties keep class-index order.
pub fn top_k(
    probs: &ProbabilityVector,
    k: i64,
    labels: &LabelEncoder,
) -> Result<Vec<RankedResult>, PipelineError> {
    if k <= 0 {
        return Err(PipelineError::InvalidInput(format!(
            "k must be positive, got {k}"
        )));
    }
    let take = usize::try_from(k).unwrap_or(usize::MAX).min(probs.len());

    let mut indexed: Vec<(usize, f32)> = probs.as_slice().iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    indexed
        .into_iter()
        .take(take)
        .map(|(idx, p)| {
            Ok(RankedResult {
                label: labels.inverse_transform(idx)?.to_string(),
                confidence: round_confidence(p).clamp(0.0, 1.0),
            })
        })
        .collect()
}
