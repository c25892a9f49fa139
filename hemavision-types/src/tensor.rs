use derive_more::AsRef;
use ndarray::{Array4, ArrayView1};

/// Side length of the square image the classifier consumes.
pub const IMAGE_SIZE: u32 = 224;

/// A single-example batch of normalized RGB pixels, shaped `(1, height, width, 3)`.
#[derive(Debug, Clone, PartialEq, AsRef)]
pub struct ImageBatch(pub Array4<f32>);

impl ImageBatch {
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.0.dim()
    }

    /// Number of values per example once flattened.
    pub fn feature_len(&self) -> usize {
        let (_, height, width, channels) = self.0.dim();
        height * width * channels
    }

    /// Row-major view of the single example. `None` when the array is not contiguous.
    pub fn flattened(&self) -> Option<ArrayView1<'_, f32>> {
        self.0
            .as_slice()
            .map(|values| ArrayView1::from(&values[..self.feature_len()]))
    }
}
