//! Soil/climate feature vectors and the fitted affine normalizer.

use serde::Deserialize;

use super::PipelineError;

/// Number of raw measurements the crop models were fit on.
pub const FEATURE_COUNT: usize = 7;

/// Feature order used at fit time. Never reorder.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "N",
    "P",
    "K",
    "temperature",
    "humidity",
    "ph",
    "rainfall",
];

/// Raw measurements in `FEATURE_NAMES` order. Values are not range-checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(
        nitrogen: f64,
        phosphorus: f64,
        potassium: f64,
        temperature: f64,
        humidity: f64,
        ph: f64,
        rainfall: f64,
    ) -> Self {
        Self([
            nitrogen,
            phosphorus,
            potassium,
            temperature,
            humidity,
            ph,
            rainfall,
        ])
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = PipelineError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let array: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| {
            PipelineError::InvalidInput(format!(
                "expected {FEATURE_COUNT} features ({}), got {}",
                FEATURE_NAMES.join(", "),
                values.len()
            ))
        })?;
        Ok(Self(array))
    }
}

/// Normalized features, already narrowed to the models' `f32` input dtype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedFeatureVector([f32; FEATURE_COUNT]);

impl NormalizedFeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Fitted per-feature affine transform, exported from the training run.
///
/// `standard`: `z = (x - mean) / scale`. `min_max`: `z = x * scale + min`.
/// Arithmetic is done in `f64` and narrowed at the end, the same order of
/// operations the fitting library applies before handing data to the models.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureNormalizer {
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl FeatureNormalizer {
    /// Check the fitted parameters against the expected feature width.
    pub fn validate(&self) -> Result<(), String> {
        let (offset, scale) = match self {
            FeatureNormalizer::Standard { mean, scale } => (mean, scale),
            FeatureNormalizer::MinMax { min, scale } => (min, scale),
        };
        if offset.len() != FEATURE_COUNT || scale.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {FEATURE_COUNT} parameters per feature, got offset={} scale={}",
                offset.len(),
                scale.len()
            ));
        }
        if offset.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err("non-finite normalizer parameter".into());
        }
        if let FeatureNormalizer::Standard { scale, .. } = self {
            if scale.iter().any(|&s| s == 0.0) {
                return Err("zero standard-deviation scale".into());
            }
        }
        Ok(())
    }

    pub fn normalize(&self, features: &FeatureVector) -> NormalizedFeatureVector {
        let mut out = [0.0f32; FEATURE_COUNT];
        for (i, (slot, &x)) in out.iter_mut().zip(features.values().iter()).enumerate() {
            let z = match self {
                FeatureNormalizer::Standard { mean, scale } => (x - mean[i]) / scale[i],
                FeatureNormalizer::MinMax { min, scale } => x * scale[i] + min[i],
            };
            *slot = z as f32;
        }
        NormalizedFeatureVector(out)
    }

    /// Normalize an untyped slice; arity is the only thing checked.
    pub fn normalize_values(
        &self,
        values: &[f64],
    ) -> Result<NormalizedFeatureVector, PipelineError> {
        let features = FeatureVector::try_from(values)?;
        Ok(self.normalize(&features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> FeatureNormalizer {
        FeatureNormalizer::Standard {
            mean: vec![50.5, 53.4, 48.1, 25.6, 71.5, 6.47, 103.5],
            scale: vec![36.9, 32.98, 50.6, 5.06, 22.26, 0.77, 54.95],
        }
    }

    fn sample() -> FeatureVector {
        FeatureVector::new(90.0, 40.0, 40.0, 25.0, 80.0, 6.5, 200.0)
    }

    #[test]
    fn standard_scaling_centers_and_scales() {
        let norm = standard();
        let z = norm.normalize(&FeatureVector::new(50.5, 53.4, 48.1, 25.6, 71.5, 6.47, 103.5));
        for v in z.as_slice() {
            assert!(v.abs() < 1e-6, "mean input should map to zero, got {v}");
        }

        let z = norm.normalize(&sample());
        let expected_n = ((90.0 - 50.5) / 36.9) as f32;
        assert_eq!(z.as_slice()[0], expected_n);
    }

    #[test]
    fn min_max_scaling_is_affine() {
        let norm = FeatureNormalizer::MinMax {
            min: vec![0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            scale: vec![0.5, 0.1, 1.0, 1.0, 1.0, 1.0, 0.01],
        };
        let z = norm.normalize(&sample());
        assert_eq!(z.as_slice()[0], 45.0);
        assert_eq!(z.as_slice()[1], 3.0);
        assert_eq!(z.as_slice()[6], 2.0);
    }

    #[test]
    fn normalize_is_bit_identical_across_calls() {
        let norm = standard();
        let a = norm.normalize(&sample());
        let b = norm.normalize(&sample());
        let bits_a: Vec<u32> = a.as_slice().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn out_of_range_values_pass_through_unclamped() {
        let norm = standard();
        let z = norm.normalize(&FeatureVector::new(-500.0, 1e6, 0.0, -40.0, 150.0, 14.5, 0.0));
        assert!(z.as_slice()[0] < -10.0);
        assert!(z.as_slice()[1] > 1000.0);
    }

    #[test]
    fn arity_mismatch_is_invalid_input() {
        let norm = standard();
        let err = norm.normalize_values(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        let err = norm.normalize_values(&[0.0; 8]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        assert!(norm.normalize_values(&[0.0; 7]).is_ok());
    }

    #[test]
    fn deserializes_tagged_json() {
        let json = r#"{"kind":"standard","mean":[0,0,0,0,0,0,0],"scale":[1,1,1,1,1,1,1]}"#;
        let norm: FeatureNormalizer = serde_json::from_str(json).unwrap();
        assert!(norm.validate().is_ok());
    }

    #[test]
    fn validate_rejects_wrong_width_and_zero_scale() {
        let short = FeatureNormalizer::Standard {
            mean: vec![0.0; 6],
            scale: vec![1.0; 6],
        };
        assert!(short.validate().is_err());

        let zero = FeatureNormalizer::Standard {
            mean: vec![0.0; 7],
            scale: vec![1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        };
        assert!(zero.validate().is_err());
    }
}
