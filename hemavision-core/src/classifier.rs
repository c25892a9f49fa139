use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use hemavision_types::prelude::*;
use thiserror::Error;

use crate::network::{Network, NetworkError};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("batch has {got} features, model expects {expected}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("inference failed")]
    Inference(#[from] NetworkError),
    #[error("model produced an invalid distribution")]
    InvalidOutput(#[from] ProbabilityError),
}

/// Anything that maps a preprocessed batch to a distribution over cell types.
pub trait Classifier: Send + Sync {
    fn predict(&self, batch: &ImageBatch) -> Result<Probabilities, ClassifierError>;

    fn is_ready(&self) -> bool {
        true
    }
}

impl Classifier for Network {
    fn predict(&self, batch: &ImageBatch) -> Result<Probabilities, ClassifierError> {
        if batch.feature_len() != self.input_size() {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.input_size(),
                got: batch.feature_len(),
            });
        }
        let input = batch
            .flattened()
            .map(|view| view.to_owned())
            .unwrap_or_else(|| batch.0.iter().copied().collect());
        let output = self.forward(input.view())?;
        Ok(Probabilities::try_from_slice(&output.to_vec())?)
    }
}

/// Owns the model path and loads the network at most once.
///
/// A failed load is remembered: later calls report [`ClassifierError::ModelUnavailable`]
/// instead of touching the disk again. A network whose input width differs from
/// `expected_inputs` counts as a failed load.
#[derive(Debug)]
pub struct ModelSlot {
    path: PathBuf,
    expected_inputs: usize,
    network: OnceLock<Result<Network, String>>,
}

impl ModelSlot {
    pub fn new(path: impl Into<PathBuf>, expected_inputs: usize) -> Self {
        Self {
            path: path.into(),
            expected_inputs,
            network: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn expected_inputs(&self) -> usize {
        self.expected_inputs
    }

    /// Loads the model if that has not been attempted yet.
    pub fn warm(&self) -> Result<&Network, ClassifierError> {
        self.network
            .get_or_init(|| {
                if !self.path.exists() {
                    tracing::warn!(path = %self.path.display(), "model not found");
                    return Err(format!("no model at {}", self.path.display()));
                }
                match Network::from_pretrained().path(&self.path).call() {
                    Ok(network) if network.input_size() != self.expected_inputs => {
                        tracing::error!(
                            path = %self.path.display(),
                            expected = self.expected_inputs,
                            got = network.input_size(),
                            "model input width does not match preprocessing"
                        );
                        Err(format!(
                            "model expects {} inputs, preprocessing produces {}",
                            network.input_size(),
                            self.expected_inputs
                        ))
                    }
                    Ok(network) => {
                        tracing::info!(path = %self.path.display(), ?network, "model loaded");
                        Ok(network)
                    }
                    Err(err) => {
                        tracing::error!(path = %self.path.display(), %err, "failed to load model");
                        Err(err.to_string())
                    }
                }
            })
            .as_ref()
            .map_err(|reason| ClassifierError::ModelUnavailable(reason.clone()))
    }

    /// Whether a load was attempted and succeeded. Never triggers a load.
    pub fn is_loaded(&self) -> bool {
        matches!(self.network.get(), Some(Ok(_)))
    }
}

impl Classifier for ModelSlot {
    fn predict(&self, batch: &ImageBatch) -> Result<Probabilities, ClassifierError> {
        self.warm()?.predict(batch)
    }

    fn is_ready(&self) -> bool {
        self.is_loaded()
    }
}
