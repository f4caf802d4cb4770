//! ONNX Runtime backend for the leaf-image classifier.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::TensorRef;
use tracing::info;

use super::disease::ImageModel;
use super::preprocess::ImageTensor;
use super::{PipelineError, ProbabilityVector};

/// CNN exported to ONNX: input `[1, 128, 128, 3]` f32, output `[1, C]` softmax.
///
/// `Session::run` needs `&mut self`, so the session sits behind a `Mutex` to
/// keep `ImageModel::predict` usable through a shared reference.
pub struct OnnxImageModel {
    session: Mutex<Session>,
    n_classes: usize,
}

impl OnnxImageModel {
    pub fn load(path: &Path, n_classes: usize) -> Result<Self, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::ArtifactMissing(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| PipelineError::corrupt(path, e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| PipelineError::corrupt(path, e.to_string()))?
            .commit_from_file(path)
            .map_err(|e: ort::Error| PipelineError::corrupt(path, format!("ONNX load failed: {e}")))?;

        info!(path = %path.display(), n_classes, "ONNX image model loaded");

        Ok(Self {
            session: Mutex::new(session),
            n_classes,
        })
    }
}

impl ImageModel for OnnxImageModel {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, image: &ImageTensor) -> Result<ProbabilityVector, PipelineError> {
        let [n, h, w, c] = image.shape();
        let array = ndarray::Array4::from_shape_vec((n, h, w, c), image.as_slice().to_vec())
            .map_err(|e| PipelineError::Inference(e.to_string()))?;
        let tensor = TensorRef::from_array_view(&array)
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PipelineError::Inference("session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| PipelineError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Inference(format!("output extraction: {e}")))?;

        if shape.last().map(|&d| d as usize) != Some(self.n_classes) {
            return Err(PipelineError::Inference(format!(
                "unexpected output shape {shape:?}, expected [1, {}]",
                self.n_classes
            )));
        }

        ProbabilityVector::new(data.to_vec())
    }
}
