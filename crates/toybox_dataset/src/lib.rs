//! Indexing and sample assembly for the Toybox multi-view image dataset.
//!
//! This crate provides utilities for:
//! - Scanning `<root>/<category>/<split>/<instance>/<rotation>_<frame>/<ratio>.png` trees
//! - Caching the parsed index as a flat CSV table
//! - Filtering by rotation axis, sampled views, and zoom ratio
//! - Assembling single-view, multi-view stack, and sphere panorama samples

// Module declarations
pub mod config;
pub mod dataset;
pub mod filter;
pub mod index;
pub mod sphere;
pub mod transform;
pub mod types;
pub mod validation;

#[cfg(feature = "burn-runtime")]
pub mod burn_impl;

// Re-export public API
pub use config::{ToyboxConfig, TOYBOX_CATEGORIES};
pub use dataset::{ToyboxDataset, ToyboxDatasetBuilder, PATH_SEPARATOR};
pub use filter::{sample_view_indices, FilteredIndex, IndexFilter};
pub use index::{discover_images, parse_record, ToyboxIndex, CACHE_COLUMNS};
pub use sphere::{stitch, strip_widths};
pub use transform::{Compose, ImageTransform, Resize, SharedTransform};
pub use types::*;
pub use validation::{summarize, IndexSummary, IrregularGroup};
