//! Process-wide, read-only application state.
//!
//! Built once at startup, wrapped in `Arc` and shared by every request.
//! Nothing in here is mutated after construction, so no locks are needed.

use std::time::Instant;

use crate::pipeline::{ArtifactSet, CropRecommender, DiseaseClassifier, DiseaseTable};

pub struct CoreState {
    artifacts: ArtifactSet,
    diseases: DiseaseTable,
    started: Instant,
}

impl CoreState {
    pub fn new(artifacts: ArtifactSet, diseases: DiseaseTable) -> Self {
        diseases.warn_unmatched(artifacts.disease.labels());
        Self {
            artifacts,
            diseases,
            started: Instant::now(),
        }
    }

    pub fn crop(&self) -> &CropRecommender {
        &self.artifacts.crop
    }

    pub fn disease(&self) -> &DiseaseClassifier {
        &self.artifacts.disease
    }

    pub fn diseases(&self) -> &DiseaseTable {
        &self.diseases
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
