use std::{fmt::Debug, io::Write, path::PathBuf};

use bon::bon;
use hemavision_types::prelude::*;
use ndarray::prelude::*;
use rand::random;
use serde::{Deserialize, Serialize};
use strum::EnumCount;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to read weights file")]
    Read(#[source] std::io::Error),
    #[error("failed to write weights file")]
    Write(#[source] std::io::Error),
    #[error("failed to (de)serialize weights")]
    Codec(#[from] bincode::Error),
    #[error("layer {layer} expects {expected} inputs, got {got}")]
    ShapeMismatch {
        layer: usize,
        expected: usize,
        got: usize,
    },
    #[error("network has no layers")]
    Empty,
    #[error("output layer has width {0}, expected one unit per cell type")]
    OutputWidth(usize),
    #[error("non-finite value in layer {0} output")]
    NotFinite(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// (n_out, n_in)
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

const EPSILON: f32 = 0.1;

pub fn relu(x: ArrayView1<f32>) -> Array1<f32> {
    x.map(|x| if *x <= 0.0 { EPSILON * x } else { *x })
}

pub fn softmax(logits: ArrayView1<f32>) -> Array1<f32> {
    let max_logit = logits.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_logits = logits.map(|x| (x - max_logit).exp());
    let sum_exp_logits = exp_logits.sum();
    exp_logits.map(|x| x / sum_exp_logits)
}

impl Layer {
    pub fn new(weights: Array2<f32>, bias: Array1<f32>) -> Self {
        Self { weights, bias }
    }

    pub fn inputs(&self) -> usize {
        self.weights.dim().1
    }

    pub fn outputs(&self) -> usize {
        self.weights.dim().0
    }

    pub fn forward(&self, prev_activation: ArrayView1<f32>) -> Array1<f32> {
        self.weights.dot(&prev_activation) + &self.bias
    }
}

/// Dense feed-forward classifier: leaky-ReLU hidden layers, softmax output.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<Layer>,
}

#[bon]
impl Network {
    pub fn new(layers: Vec<Layer>) -> Result<Self, NetworkError> {
        let network = Network { layers };
        network.validate()?;
        Ok(network)
    }

    #[builder]
    pub fn from_pretrained(path: impl Into<PathBuf>) -> Result<Self, NetworkError> {
        let weights = std::fs::read(path.into()).map_err(NetworkError::Read)?;
        let network: Network = bincode::deserialize(&weights)?;
        network.validate()?;
        Ok(network)
    }

    pub fn save_data(&self, path: impl Into<PathBuf>) -> Result<(), NetworkError> {
        let data = bincode::serialize(self)?;
        std::fs::File::create(path.into())
            .and_then(|mut file| file.write_all(&data))
            .map_err(NetworkError::Write)
    }

    /// Randomly initialized network whose last layer has one unit per cell type.
    #[builder]
    pub fn untrained(input_size: usize, hidden: Option<&[usize]>) -> Self {
        let layers = hidden
            .unwrap_or_default()
            .iter()
            .copied()
            .chain(std::iter::once(CellType::COUNT))
            .scan(None, |prev_size_state, size| {
                let prev_size = prev_size_state.unwrap_or(input_size);
                let generate = || (random::<f32>() - 0.5) * (2.0 / prev_size as f32).sqrt();
                let weights = Array2::from_shape_fn((size, prev_size), |_| generate());
                let bias = Array1::zeros(size);
                *prev_size_state = Some(size);
                Some(Layer { weights, bias })
            })
            .collect();
        Network { layers }
    }

    fn validate(&self) -> Result<(), NetworkError> {
        let output = self.layers.last().ok_or(NetworkError::Empty)?;
        for (idx, pair) in self.layers.windows(2).enumerate() {
            if pair[1].inputs() != pair[0].outputs() {
                return Err(NetworkError::ShapeMismatch {
                    layer: idx + 1,
                    expected: pair[1].inputs(),
                    got: pair[0].outputs(),
                });
            }
        }
        if output.outputs() != CellType::COUNT {
            return Err(NetworkError::OutputWidth(output.outputs()));
        }
        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(Layer::inputs).unwrap_or_default()
    }

    /// Runs every layer and returns the softmax of the final one.
    pub fn forward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>, NetworkError> {
        let last = self.layers.len().checked_sub(1).ok_or(NetworkError::Empty)?;
        let mut activation = input.to_owned();
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.inputs() != activation.len() {
                return Err(NetworkError::ShapeMismatch {
                    layer: idx,
                    expected: layer.inputs(),
                    got: activation.len(),
                });
            }
            let z = layer.forward(activation.view());
            if z.iter().any(|v| !v.is_finite()) {
                return Err(NetworkError::NotFinite(idx));
            }
            activation = if idx == last {
                softmax(z.view())
            } else {
                relu(z.view())
            };
        }
        Ok(activation)
    }
}

impl Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let weights: Vec<_> = self.layers.iter().map(|l| l.weights.dim()).collect();
        let bias: Vec<_> = self.layers.iter().map(|l| l.bias.dim()).collect();
        write!(
            f,
            "Network {{ weights: {:#?}, bias: {:#?} }}",
            weights, bias
        )
    }
}
