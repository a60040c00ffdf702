//! Core types, error definitions, and data structures for toybox_dataset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, ToyboxError>;

#[derive(Debug, Error)]
pub enum ToyboxError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("config parse error at {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("malformed dataset path {path}: {reason}")]
    MalformedPath { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("category {0:?} is not in the configured category list")]
    UnknownCategory(String),
    #[error("image file missing: {path}")]
    MissingImageFile { path: PathBuf },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("view {path} is {found:?}, expected {expected:?} (width, height)")]
    ShapeMismatch {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Number of frames captured along one rotation.
pub const FRAMES_PER_ROTATION: u32 = 18;

/// Consecutive discovery rows that share one `view_index`.
pub const ROWS_PER_VIEW: usize = 4;

/// One image file of the collection. Field renames match the cache columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub dataset: String,
    #[serde(rename = "ca")]
    pub category: String,
    #[serde(rename = "no")]
    pub instance: u32,
    #[serde(rename = "tr")]
    pub rotation_axis: String,
    #[serde(rename = "fr")]
    pub frame_index: u32,
    pub ratio: u32,
    pub view_index: u32,
}

impl FileRecord {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            category: self.category.clone(),
            instance: self.instance,
            rotation_axis: self.rotation_axis.clone(),
            ratio: self.ratio,
        }
    }
}

/// Rows sharing a key form one multi-view / sphere group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub category: String,
    pub instance: u32,
    pub rotation_axis: String,
    pub ratio: u32,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.category, self.instance, self.rotation_axis, self.ratio
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplingMode {
    /// One image per sample.
    #[serde(rename = "sv")]
    SingleView,
    /// All views of a group stacked along a leading axis.
    #[serde(rename = "mv")]
    MultiView,
    /// Central strips of a group's views stitched into one panorama.
    #[serde(rename = "sp")]
    Sphere,
}

impl SamplingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingMode::SingleView => "sv",
            SamplingMode::MultiView => "mv",
            SamplingMode::Sphere => "sp",
        }
    }
}

impl FromStr for SamplingMode {
    type Err = ToyboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sv" => Ok(SamplingMode::SingleView),
            "mv" => Ok(SamplingMode::MultiView),
            "sp" => Ok(SamplingMode::Sphere),
            other => Err(ToyboxError::InvalidConfig(format!("invalid mode {other}"))),
        }
    }
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Views of one group in `[views, channels, height, width]` layout, normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewStack {
    pub views: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub data: Vec<f32>,
}

impl ViewStack {
    pub fn shape(&self) -> [usize; 4] {
        [self.views, self.channels, self.height, self.width]
    }

    /// CHW slice of a single view.
    pub fn view(&self, i: usize) -> Option<&[f32]> {
        let len = self.channels * self.height * self.width;
        self.data.get(i * len..(i + 1) * len)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleImage {
    /// Single-view image, or the stitched sphere panorama.
    Image(image::RgbImage),
    /// Multi-view stack.
    Stack(ViewStack),
}

impl SampleImage {
    pub fn as_image(&self) -> Option<&image::RgbImage> {
        match self {
            SampleImage::Image(img) => Some(img),
            SampleImage::Stack(_) => None,
        }
    }

    pub fn as_stack(&self) -> Option<&ViewStack> {
        match self {
            SampleImage::Stack(stack) => Some(stack),
            SampleImage::Image(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: SampleImage,
    /// Position of the category in the configured category list.
    pub label: usize,
    /// Source path, or the `>`-joined paths of every contributing view.
    pub path: String,
}
