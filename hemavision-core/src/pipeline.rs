use std::sync::Arc;

use bon::bon;
use hemavision_types::prelude::*;
use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::{
    chart::ChartRenderer,
    classifier::{Classifier, ClassifierError},
    preprocess::{DecodeError, Preprocessor},
    report::generate_report,
    simulate::Simulator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Model,
    Demo,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("simulation produced an invalid distribution")]
    Simulation(#[from] ProbabilityError),
}

/// Where predictions come from.
#[derive(Clone)]
pub enum Backend {
    Model(Arc<dyn Classifier>),
    Demo(Simulator),
}

impl Backend {
    pub fn mode(&self) -> Mode {
        match self {
            Backend::Model(_) => Mode::Model,
            Backend::Demo(_) => Mode::Demo,
        }
    }

    /// Whether predictions can currently be served.
    pub fn is_ready(&self) -> bool {
        match self {
            Backend::Model(classifier) => classifier.is_ready(),
            Backend::Demo(_) => true,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Backend {{ mode: {} }}", self.mode())
    }
}

/// Everything produced for one image.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub probabilities: Probabilities,
    pub report: DiagnosticReport,
    /// `None` when the chart could not be rendered.
    pub chart: Option<String>,
}

/// Preprocess, predict, report and chart, shared by the server and the CLI.
#[derive(Debug)]
pub struct Pipeline {
    preprocessor: Preprocessor,
    backend: Backend,
    chart: ChartRenderer,
}

#[bon]
impl Pipeline {
    #[builder]
    pub fn new(
        backend: Backend,
        preprocessor: Option<Preprocessor>,
        chart: Option<ChartRenderer>,
    ) -> Self {
        Self {
            preprocessor: preprocessor.unwrap_or_default(),
            backend,
            chart: chart.unwrap_or_default(),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn chart(&self) -> &ChartRenderer {
        &self.chart
    }

    /// Decodes the image and predicts. The demo backend seeds itself from `source_name`.
    pub fn predict(&self, bytes: &[u8], source_name: &str) -> Result<Probabilities, PipelineError> {
        let batch = self.preprocessor.preprocess(bytes)?;
        let probabilities = match &self.backend {
            Backend::Model(classifier) => classifier.predict(&batch)?,
            Backend::Demo(simulator) => simulator.simulate(source_name)?,
        };
        Ok(probabilities)
    }

    /// Full run for one image. `stored_name` is the name the report refers to.
    #[tracing::instrument(skip(self, bytes), fields(mode = %self.backend.mode(), len = bytes.len()))]
    pub fn diagnose(
        &self,
        bytes: &[u8],
        source_name: &str,
        stored_name: &str,
    ) -> Result<Diagnosis, PipelineError> {
        let probabilities = self.predict(bytes, source_name)?;
        let report = generate_report()
            .probabilities(&probabilities)
            .filename(stored_name)
            .call();
        let chart = self
            .chart
            .render_data_uri(&probabilities)
            .inspect_err(|err| tracing::warn!(%err, "chart unavailable"))
            .ok();
        tracing::info!(
            predicted = %report.predicted_cell_type,
            confidence = %report.confidence,
            "diagnosis complete"
        );
        Ok(Diagnosis {
            probabilities,
            report,
            chart,
        })
    }
}
