//! Plant-disease classification and the static remediation table.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::artifacts::read_json;
use super::labels::LabelEncoder;
use super::preprocess::{self, ImageTensor};
use super::{PipelineError, ProbabilityVector};

// ═══════════════════════════════════════════════════════════
// Reference table
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Severe,
    #[serde(rename = "Very High")]
    VeryHigh,
}

/// Remediation guidance for one class label. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiseaseRecord {
    pub severity: Severity,
    pub symptoms: String,
    pub cure: String,
    #[serde(default)]
    pub chemicals: Vec<String>,
    #[serde(default)]
    pub organic: Vec<String>,
    pub prevention: String,
}

/// Label → record lookup, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct DiseaseTable {
    records: HashMap<String, DiseaseRecord>,
}

impl DiseaseTable {
    pub fn new(records: HashMap<String, DiseaseRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let records: HashMap<String, DiseaseRecord> = read_json(path)?;
        info!(records = records.len(), path = %path.display(), "disease table loaded");
        Ok(Self { records })
    }

    pub fn get(&self, label: &str) -> Option<&DiseaseRecord> {
        self.records.get(label)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Log table entries the model can never predict. Returns how many there were.
    pub fn warn_unmatched(&self, labels: &LabelEncoder) -> usize {
        let mut unmatched = 0;
        for label in self.records.keys() {
            if labels.transform(label).is_none() {
                warn!(label, "disease table entry does not match any model class");
                unmatched += 1;
            }
        }
        unmatched
    }
}

// ═══════════════════════════════════════════════════════════
// Classifier
// ═══════════════════════════════════════════════════════════

/// Convolutional model over a preprocessed leaf image.
pub trait ImageModel: Send + Sync {
    fn n_classes(&self) -> usize;

    fn predict(&self, image: &ImageTensor) -> Result<ProbabilityVector, PipelineError>;
}

/// Response payload of the disease endpoint.
///
/// Guidance fields are `None` when the table has no record for the label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseDiagnosis {
    pub class_index: usize,
    pub label: String,
    pub confidence: f32,
    pub severity: Option<Severity>,
    pub symptoms: Option<String>,
    pub cure: Option<String>,
    pub recommended_chemicals: Option<Vec<String>>,
    pub organic_solutions: Option<Vec<String>>,
    pub prevention: Option<String>,
}

impl DiseaseDiagnosis {
    pub fn new(
        class_index: usize,
        label: String,
        confidence: f32,
        record: Option<&DiseaseRecord>,
    ) -> Self {
        Self {
            class_index,
            label,
            confidence,
            severity: record.map(|r| r.severity),
            symptoms: record.map(|r| r.symptoms.clone()),
            cure: record.map(|r| r.cure.clone()),
            recommended_chemicals: record.map(|r| r.chemicals.clone()),
            organic_solutions: record.map(|r| r.organic.clone()),
            prevention: record.map(|r| r.prevention.clone()),
        }
    }
}

pub struct DiseaseClassifier {
    model: Box<dyn ImageModel>,
    labels: LabelEncoder,
}

impl DiseaseClassifier {
    pub fn new(model: Box<dyn ImageModel>, labels: LabelEncoder) -> Result<Self, String> {
        labels.validate()?;
        if model.n_classes() != labels.len() {
            return Err(format!(
                "image model has {} outputs, class table has {}",
                model.n_classes(),
                labels.len()
            ));
        }
        Ok(Self { model, labels })
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// Argmax class and its probability.
    pub fn classify(&self, image: &ImageTensor) -> Result<(usize, f32), PipelineError> {
        let probs = self.model.predict(image)?;
        if probs.len() != self.labels.len() {
            return Err(PipelineError::Inference(format!(
                "image model produced {} probabilities, expected {}",
                probs.len(),
                self.labels.len()
            )));
        }
        Ok(probs.argmax())
    }

    /// Decode, preprocess, classify and enrich one uploaded image.
    pub fn diagnose(
        &self,
        bytes: &[u8],
        table: &DiseaseTable,
    ) -> Result<DiseaseDiagnosis, PipelineError> {
        let started = Instant::now();
        let tensor = preprocess::preprocess_bytes(bytes)?;
        let (class_index, confidence) = self.classify(&tensor)?;
        let label = self.labels.inverse_transform(class_index)?.to_string();
        let record = table.get(&label);
        debug!(
            class_index,
            label = %label,
            confidence,
            has_record = record.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "disease classified"
        );
        Ok(DiseaseDiagnosis::new(class_index, label, confidence, record))
    }
}
