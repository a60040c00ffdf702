//! Exposes [`ToyboxDataset`] to Burn's data loaders.

use burn::data::dataset::Dataset;

use crate::dataset::ToyboxDataset;
use crate::types::Sample;

impl Dataset<Sample> for ToyboxDataset {
    /// Assembly failures are logged and surface as `None`.
    fn get(&self, index: usize) -> Option<Sample> {
        match ToyboxDataset::get(self, index) {
            Ok(sample) => Some(sample),
            Err(err) => {
                tracing::warn!(index, %err, "toybox sample unavailable");
                None
            }
        }
    }

    fn len(&self) -> usize {
        ToyboxDataset::len(self)
    }
}
