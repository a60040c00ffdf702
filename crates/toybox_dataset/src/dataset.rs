//! The Toybox dataset: filtered index plus per-mode sample assembly.

use crate::config::ToyboxConfig;
use crate::filter::{sample_view_indices, FilteredIndex, IndexFilter};
use crate::index::ToyboxIndex;
use crate::sphere;
use crate::transform::{ImageTransform, SharedTransform};
use crate::types::{
    DatasetResult, FileRecord, Sample, SampleImage, SamplingMode, ToyboxError, ViewStack,
    FRAMES_PER_ROTATION,
};
use crate::validation::{summarize, IndexSummary};
use image::RgbImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Separator between contributing paths in multi-view and sphere samples.
pub const PATH_SEPARATOR: &str = ">";

/// Irregular groups named individually in the construction warning.
const MAX_REPORTED_GROUPS: usize = 5;

/// Construction options for [`ToyboxDataset`].
#[derive(Clone)]
pub struct ToyboxDatasetBuilder {
    root: PathBuf,
    rotation_axes: Option<Vec<String>>,
    nview: usize,
    ratios: Option<Vec<u32>>,
    mode: SamplingMode,
    split: String,
    preload: bool,
    transform: Option<SharedTransform>,
}

impl ToyboxDatasetBuilder {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            rotation_axes: None,
            nview: FRAMES_PER_ROTATION as usize,
            ratios: None,
            mode: SamplingMode::SingleView,
            split: "train".to_string(),
            preload: true,
            transform: None,
        }
    }

    /// Rotation axes to keep, e.g. `rzplus`; `None` keeps all.
    pub fn rotation_axes(mut self, axes: Option<Vec<String>>) -> Self {
        self.rotation_axes = axes;
        self
    }

    /// Views sampled per rotation, at most 18; `0` keeps every view.
    pub fn nview(mut self, nview: usize) -> Self {
        self.nview = nview;
        self
    }

    /// Zoom ratios to keep, e.g. 25/50/75/100; `None` keeps all.
    pub fn ratios(mut self, ratios: Option<Vec<u32>>) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn mode(mut self, mode: SamplingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn split(mut self, split: &str) -> Self {
        self.split = split.to_string();
        self
    }

    /// Assemble every sample up front and serve them from memory.
    pub fn preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn transform<T: ImageTransform + 'static>(mut self, transform: T) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn shared_transform(mut self, transform: Option<SharedTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Build (or read the cached) index for the root, then filter and optionally preload.
    pub fn build(self, config: &ToyboxConfig) -> DatasetResult<ToyboxDataset> {
        let index = ToyboxIndex::build(&self.root, config)?;
        ToyboxDataset::from_index(&index, self, config)
    }
}

pub struct ToyboxDataset {
    root: PathBuf,
    split: String,
    mode: SamplingMode,
    nview: usize,
    config: ToyboxConfig,
    filtered: FilteredIndex,
    transform: Option<SharedTransform>,
    preloaded: Option<Vec<Sample>>,
}

impl fmt::Debug for ToyboxDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToyboxDataset")
            .field("root", &self.root)
            .field("split", &self.split)
            .field("mode", &self.mode)
            .field("nview", &self.nview)
            .field("rows", &self.filtered.len())
            .field("transform", &self.transform.is_some())
            .field("preloaded", &self.preloaded.as_ref().map(Vec::len))
            .finish()
    }
}

impl ToyboxDataset {
    pub fn builder<P: AsRef<Path>>(root: P) -> ToyboxDatasetBuilder {
        ToyboxDatasetBuilder::new(root)
    }

    /// Filter an existing index for `options.split` and construct the dataset.
    pub fn from_index(
        index: &ToyboxIndex,
        options: ToyboxDatasetBuilder,
        config: &ToyboxConfig,
    ) -> DatasetResult<Self> {
        if options.nview > FRAMES_PER_ROTATION as usize {
            return Err(ToyboxError::InvalidConfig(format!(
                "nview {} exceeds the {FRAMES_PER_ROTATION} frames of a rotation",
                options.nview
            )));
        }
        let split_rows = index.for_split(&options.split);
        let filter = IndexFilter {
            rotation_axes: options.rotation_axes,
            view_indices: sample_view_indices(options.nview),
            ratios: options.ratios,
        };
        let filtered = filter.apply(&split_rows);
        tracing::info!(
            split = %options.split,
            mode = %options.mode,
            nview = options.nview,
            split_rows = split_rows.len(),
            rows = filtered.len(),
            "filtered toybox index"
        );

        let mut dataset = Self {
            root: options.root,
            split: options.split,
            mode: options.mode,
            nview: options.nview,
            config: config.clone(),
            filtered,
            transform: options.transform,
            preloaded: None,
        };
        if dataset.mode != SamplingMode::SingleView {
            dataset.warn_irregular_groups();
        }
        if options.preload {
            dataset.preloaded = Some(dataset.preload_all()?);
        }
        Ok(dataset)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn nview(&self) -> usize {
        self.nview
    }

    /// Rows expected per (category, instance, rotation, ratio) group.
    pub fn views_per_group(&self) -> usize {
        if self.nview == 0 {
            FRAMES_PER_ROTATION as usize
        } else {
            self.nview
        }
    }

    pub fn filtered(&self) -> &FilteredIndex {
        &self.filtered
    }

    pub fn is_preloaded(&self) -> bool {
        self.preloaded.is_some()
    }

    pub fn summary(&self) -> IndexSummary {
        summarize(&self.filtered, self.views_per_group())
    }

    /// Filtered rows, or whole groups in multi-view mode.
    pub fn len(&self) -> usize {
        match self.mode {
            SamplingMode::MultiView => self.filtered.len() / self.views_per_group(),
            SamplingMode::SingleView | SamplingMode::Sphere => self.filtered.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> DatasetResult<Sample> {
        match &self.preloaded {
            Some(samples) => samples
                .get(index)
                .cloned()
                .ok_or(ToyboxError::IndexOutOfRange {
                    index,
                    len: samples.len(),
                }),
            None => self.assemble(index),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = DatasetResult<Sample>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    fn preload_all(&self) -> DatasetResult<Vec<Sample>> {
        let total = self.len();
        let report_every = (total / 10).max(1);
        let mut samples = Vec::with_capacity(total);
        for index in 0..total {
            samples.push(self.assemble(index)?);
            let loaded = index + 1;
            if loaded % report_every == 0 || loaded == total {
                tracing::info!(loaded, total, "preloading toybox samples");
            }
        }
        Ok(samples)
    }

    fn warn_irregular_groups(&self) {
        let summary = self.summary();
        if summary.is_regular() {
            return;
        }
        let examples: Vec<String> = summary
            .irregular
            .iter()
            .take(MAX_REPORTED_GROUPS)
            .map(|g| format!("{} ({} rows)", g.key, g.rows))
            .collect();
        tracing::warn!(
            irregular = summary.irregular.len(),
            groups = summary.groups,
            expected = self.views_per_group(),
            examples = %examples.join(", "),
            "view groups with unexpected size; stacks and panoramas will be sized accordingly"
        );
    }

    fn assemble(&self, index: usize) -> DatasetResult<Sample> {
        let len = self.len();
        if index >= len {
            return Err(ToyboxError::IndexOutOfRange { index, len });
        }
        match self.mode {
            SamplingMode::SingleView => self.assemble_single(index),
            SamplingMode::MultiView => self.assemble_stack(index * self.views_per_group()),
            SamplingMode::Sphere => self.assemble_sphere(index),
        }
    }

    fn row(&self, index: usize) -> DatasetResult<&FileRecord> {
        self.filtered
            .row(index)
            .ok_or(ToyboxError::IndexOutOfRange {
                index,
                len: self.filtered.len(),
            })
    }

    fn apply_transform(&self, img: RgbImage) -> DatasetResult<RgbImage> {
        match &self.transform {
            Some(t) => t.apply(img),
            None => Ok(img),
        }
    }

    fn assemble_single(&self, index: usize) -> DatasetResult<Sample> {
        let row = self.row(index)?;
        let label = self.config.label_of(&row.category)?;
        let img = self.apply_transform(load_rgb(&row.path)?)?;
        Ok(Sample {
            image: SampleImage::Image(img),
            label,
            path: row.path.display().to_string(),
        })
    }

    fn assemble_stack(&self, row_index: usize) -> DatasetResult<Sample> {
        let row = self.row(row_index)?;
        let label = self.config.label_of(&row.category)?;
        let group = self.filtered.group(&row.group_key());
        let views = group
            .iter()
            .map(|r| {
                let img = self.apply_transform(load_rgb(&r.path)?)?;
                Ok((r.path.as_path(), img))
            })
            .collect::<DatasetResult<Vec<_>>>()?;
        Ok(Sample {
            image: SampleImage::Stack(stack_views(&views)?),
            label,
            path: join_paths(&group),
        })
    }

    fn assemble_sphere(&self, index: usize) -> DatasetResult<Sample> {
        let row = self.row(index)?;
        let label = self.config.label_of(&row.category)?;
        let group = self.filtered.group(&row.group_key());
        let views = group
            .iter()
            .map(|r| load_rgb(&r.path))
            .collect::<DatasetResult<Vec<_>>>()?;
        let panorama = sphere::stitch(&views, self.views_per_group());
        Ok(Sample {
            image: SampleImage::Image(self.apply_transform(panorama)?),
            label,
            path: join_paths(&group),
        })
    }
}

fn join_paths(rows: &[&FileRecord]) -> String {
    rows.iter()
        .map(|r| r.path.display().to_string())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

fn load_rgb(path: &Path) -> DatasetResult<RgbImage> {
    if !path.exists() {
        return Err(ToyboxError::MissingImageFile {
            path: path.to_path_buf(),
        });
    }
    let img = image::open(path).map_err(|e| ToyboxError::Image {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(img.to_rgb8())
}

/// Stack equally sized views into `[views, 3, height, width]`, normalized to [0, 1].
fn stack_views(views: &[(&Path, RgbImage)]) -> DatasetResult<ViewStack> {
    let (width, height) = views.first().map(|(_, img)| img.dimensions()).unwrap_or((0, 0));
    let plane = (width * height) as usize;
    let mut data = Vec::with_capacity(views.len() * 3 * plane);
    for (path, img) in views {
        if img.dimensions() != (width, height) {
            return Err(ToyboxError::ShapeMismatch {
                path: path.to_path_buf(),
                expected: (width, height),
                found: img.dimensions(),
            });
        }
        let mut chw = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in img.enumerate_pixels() {
            let base = (y * width + x) as usize;
            chw[base] = pixel[0] as f32 / 255.0;
            chw[plane + base] = pixel[1] as f32 / 255.0;
            chw[2 * plane + base] = pixel[2] as f32 / 255.0;
        }
        data.extend_from_slice(&chw);
    }
    Ok(ViewStack {
        views: views.len(),
        channels: 3,
        height: height as usize,
        width: width as usize,
        data,
    })
}
