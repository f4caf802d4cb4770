//! Shared request/response types for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core_state::CoreState;
use crate::pipeline::{FeatureVector, RankedResult};

/// Number of crops returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: i64 = 3;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Router state. Cheap to clone; all clones share one `CoreState`.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Crop recommendation
// ═══════════════════════════════════════════════════════════

/// Soil and climate measurements, named as the deployed clients send them.
#[derive(Debug, Clone, Deserialize)]
pub struct CropRequest {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

impl CropRequest {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropChoice {
    pub crop: String,
    pub confidence: f64,
}

impl From<RankedResult> for CropChoice {
    fn from(r: RankedResult) -> Self {
        Self {
            crop: r.label,
            confidence: r.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CropResponse {
    pub status: &'static str,
    pub top_3_crops: Vec<CropChoice>,
}
