pub use crate::cell::{CellInfo, CellType};
pub use crate::probabilities::{Probabilities, ProbabilityError, PROBABILITY_TOLERANCE};
pub use crate::report::{DiagnosticReport, PercentageMap};
pub use crate::tensor::{ImageBatch, IMAGE_SIZE};
