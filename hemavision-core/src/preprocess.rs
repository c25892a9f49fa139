use std::path::{Path, PathBuf};

use bon::bon;
use hemavision_types::prelude::*;
use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read image file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Turns encoded images into the normalized batch the classifier expects.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    size: u32,
    filter: FilterType,
}

#[bon]
impl Preprocessor {
    #[builder]
    pub fn new(size: Option<u32>, filter: Option<FilterType>) -> Self {
        Self {
            size: size.unwrap_or(IMAGE_SIZE),
            filter: filter.unwrap_or(FilterType::Triangle),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Length of a flattened batch produced by this preprocessor.
    pub fn feature_len(&self) -> usize {
        self.size as usize * self.size as usize * 3
    }

    pub fn preprocess(&self, bytes: &[u8]) -> Result<ImageBatch, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "decoded image"
        );
        Ok(self.to_batch(&image))
    }

    pub fn preprocess_path(&self, path: impl AsRef<Path>) -> Result<ImageBatch, DecodeError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.preprocess(&bytes)
    }

    pub fn to_batch(&self, image: &DynamicImage) -> ImageBatch {
        let rgb = image.to_rgb8();
        let resized = image::imageops::resize(&rgb, self.size, self.size, self.filter);
        let size = self.size as usize;
        ImageBatch(Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / u8::MAX as f32
        }))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::builder().build()
    }
}
