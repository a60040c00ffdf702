//! Caller-supplied image transforms applied after loading.

use crate::types::DatasetResult;
use image::imageops::FilterType;
use image::RgbImage;
use std::fmt;
use std::sync::Arc;

/// Single image in, single image out.
pub trait ImageTransform: Send + Sync {
    fn apply(&self, image: RgbImage) -> DatasetResult<RgbImage>;
}

impl<F> ImageTransform for F
where
    F: Fn(RgbImage) -> DatasetResult<RgbImage> + Send + Sync,
{
    fn apply(&self, image: RgbImage) -> DatasetResult<RgbImage> {
        self(image)
    }
}

/// Shared, type-erased transform as stored by the dataset.
pub type SharedTransform = Arc<dyn ImageTransform>;

#[derive(Debug, Clone, Copy)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub filter: FilterType,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
        }
    }

    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl ImageTransform for Resize {
    fn apply(&self, image: RgbImage) -> DatasetResult<RgbImage> {
        if image.dimensions() == (self.width, self.height) {
            return Ok(image);
        }
        Ok(image::imageops::resize(
            &image,
            self.width,
            self.height,
            self.filter,
        ))
    }
}

/// Runs transforms in order, stopping at the first error.
#[derive(Clone, Default)]
pub struct Compose {
    steps: Vec<SharedTransform>,
}

impl Compose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<T: ImageTransform + 'static>(mut self, step: T) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compose")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl ImageTransform for Compose {
    fn apply(&self, image: RgbImage) -> DatasetResult<RgbImage> {
        self.steps.iter().try_fold(image, |img, step| step.apply(img))
    }
}
