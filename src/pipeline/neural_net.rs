//! Feed-forward network evaluated from an exported layer list.
//!
//! The export is a JSON object `{ "layers": [...] }` whose entries mirror the
//! Keras Sequential stack the crop ANN was trained as. Dense kernels keep the
//! Keras `[inputs][units]` layout.

use serde::Deserialize;

use super::classifier::{check_input_width, check_output_width, Classifier};
use super::probability::{sigmoid, softmax};
use super::{PipelineError, ProbabilityVector};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    fn apply(self, values: &mut Vec<f32>) {
        match self {
            Activation::Linear => {}
            Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Sigmoid => values.iter_mut().for_each(|v| *v = sigmoid(*v)),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::Softmax => *values = softmax(values),
        }
    }
}

fn default_epsilon() -> f32 {
    1e-3
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    Dense {
        weights: Vec<Vec<f32>>,
        bias: Vec<f32>,
        #[serde(default)]
        activation: Activation,
    },
    BatchNorm {
        gamma: Vec<f32>,
        beta: Vec<f32>,
        moving_mean: Vec<f32>,
        moving_variance: Vec<f32>,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
    /// Identity at inference time.
    Dropout {
        #[serde(default)]
        rate: f32,
    },
    Activation {
        activation: Activation,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct NeuralNetExport {
    pub layers: Vec<Layer>,
}

/// Dense classifier network; the last transform must be a softmax.
#[derive(Debug, Clone)]
pub struct NeuralNetClassifier {
    name: String,
    layers: Vec<Layer>,
    n_features: usize,
    n_classes: usize,
}

impl NeuralNetClassifier {
    /// Validate layer shapes and build the classifier.
    pub fn from_export(name: impl Into<String>, export: NeuralNetExport) -> Result<Self, String> {
        let layers = export.layers;
        let n_features = layers
            .iter()
            .find_map(|layer| match layer {
                Layer::Dense { weights, .. } => Some(weights.len()),
                _ => None,
            })
            .ok_or("network has no dense layer")?;

        let mut width = n_features;
        let mut last_activation = Activation::Linear;
        for (idx, layer) in layers.iter().enumerate() {
            match layer {
                Layer::Dense {
                    weights,
                    bias,
                    activation,
                } => {
                    if weights.len() != width {
                        return Err(format!(
                            "layer {idx}: kernel has {} rows, incoming width is {width}",
                            weights.len()
                        ));
                    }
                    let units = bias.len();
                    if units == 0 {
                        return Err(format!("layer {idx}: dense layer has no units"));
                    }
                    if let Some(row) = weights.iter().position(|r| r.len() != units) {
                        return Err(format!(
                            "layer {idx}: kernel row {row} does not match {units} units"
                        ));
                    }
                    width = units;
                    last_activation = *activation;
                }
                Layer::BatchNorm {
                    gamma,
                    beta,
                    moving_mean,
                    moving_variance,
                    ..
                } => {
                    let lens = [
                        gamma.len(),
                        beta.len(),
                        moving_mean.len(),
                        moving_variance.len(),
                    ];
                    if lens.iter().any(|&l| l != width) {
                        return Err(format!(
                            "layer {idx}: batch norm parameters {lens:?} do not match width {width}"
                        ));
                    }
                    last_activation = Activation::Linear;
                }
                Layer::Dropout { .. } => {}
                Layer::Activation { activation } => last_activation = *activation,
            }
        }

        if last_activation != Activation::Softmax {
            return Err("network must end in a softmax activation".into());
        }

        Ok(Self {
            name: name.into(),
            layers,
            n_features,
            n_classes: width,
        })
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut x = input.to_vec();
        for layer in &self.layers {
            match layer {
                Layer::Dense {
                    weights,
                    bias,
                    activation,
                } => {
                    let mut out = bias.clone();
                    for (xi, row) in x.iter().zip(weights) {
                        for (o, w) in out.iter_mut().zip(row) {
                            *o += xi * w;
                        }
                    }
                    activation.apply(&mut out);
                    x = out;
                }
                Layer::BatchNorm {
                    gamma,
                    beta,
                    moving_mean,
                    moving_variance,
                    epsilon,
                } => {
                    for (i, v) in x.iter_mut().enumerate() {
                        let inv_std = 1.0 / (moving_variance[i] + epsilon).sqrt();
                        *v = gamma[i] * (*v - moving_mean[i]) * inv_std + beta[i];
                    }
                }
                Layer::Dropout { .. } => {}
                Layer::Activation { activation } => activation.apply(&mut x),
            }
        }
        x
    }
}

impl Classifier for NeuralNetClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f32]) -> Result<ProbabilityVector, PipelineError> {
        check_input_width(self, features)?;
        let probs = ProbabilityVector::new(self.forward(features))?;
        check_output_width(self, &probs)?;
        Ok(probs)
    }
}
