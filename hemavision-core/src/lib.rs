pub mod chart;
pub mod classifier;
pub mod network;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod simulate;

pub use chart::{html_export::HtmlExport, ChartError, ChartRenderer, Typeface};
pub use classifier::{Classifier, ClassifierError, ModelSlot};
pub use network::{Network, NetworkError};
pub use pipeline::{Backend, Diagnosis, Mode, Pipeline, PipelineError};
pub use preprocess::{DecodeError, Preprocessor};
pub use report::generate_report;
pub use simulate::Simulator;
