//! Discovering image files, parsing their metadata, and caching the result.

use crate::config::ToyboxConfig;
use crate::types::{DatasetResult, FileRecord, ToyboxError, FRAMES_PER_ROTATION, ROWS_PER_VIEW};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory levels between the root and an image: `<ca>/<split>/<no>/<tr>_<fr>/<ratio>.png`.
const IMAGE_DEPTH: usize = 5;

/// Cache header, in column order.
pub const CACHE_COLUMNS: [&str; 8] = [
    "path",
    "dataset",
    "ca",
    "no",
    "tr",
    "fr",
    "ratio",
    "view_index",
];

/// Every image record of a dataset root, all splits, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToyboxIndex {
    records: Vec<FileRecord>,
}

impl ToyboxIndex {
    /// Read the configured cache when allowed and present; otherwise scan `root`
    /// and write the cache.
    ///
    /// The cache is trusted as-is. Nothing checks it against the directory.
    pub fn build(root: &Path, config: &ToyboxConfig) -> DatasetResult<Self> {
        let cache_path = config.cache_path();
        if config.read_cache && cache_path.exists() {
            let index = Self::load_cache(&cache_path)?;
            tracing::info!(
                rows = index.len(),
                cache = %cache_path.display(),
                "loaded toybox index from cache"
            );
            return Ok(index);
        }
        let index = Self::scan(root)?;
        index.save_cache(&cache_path)?;
        tracing::info!(
            rows = index.len(),
            cache = %cache_path.display(),
            "wrote toybox index cache"
        );
        Ok(index)
    }

    /// Walk `root` and parse every image path. Any malformed path fails the scan.
    pub fn scan(root: &Path) -> DatasetResult<Self> {
        let paths = discover_images(root)?;
        if paths.is_empty() {
            tracing::warn!(root = %root.display(), "no images found under dataset root");
        } else {
            tracing::info!(root = %root.display(), files = paths.len(), "scanned dataset root");
        }
        Self::from_paths(paths)
    }

    /// Parse `paths` (already in discovery order) and assign positional view indices.
    pub fn from_paths<I>(paths: I) -> DatasetResult<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let records = paths
            .into_iter()
            .enumerate()
            .map(|(row, path)| {
                let mut record = parse_record(&path)?;
                record.view_index = positional_view_index(row);
                Ok(record)
            })
            .collect::<DatasetResult<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<FileRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows belonging to one dataset split, order preserved.
    pub fn for_split(&self, split: &str) -> Vec<FileRecord> {
        self.records
            .iter()
            .filter(|r| r.dataset == split)
            .cloned()
            .collect()
    }

    pub fn load_cache(path: &Path) -> DatasetResult<Self> {
        let csv_err = |e| ToyboxError::Csv {
            path: path.to_path_buf(),
            source: e,
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
        let records = reader
            .deserialize::<FileRecord>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;
        Ok(Self { records })
    }

    pub fn save_cache(&self, path: &Path) -> DatasetResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ToyboxError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let csv_err = |e| ToyboxError::Csv {
            path: path.to_path_buf(),
            source: e,
        };
        // Header is written by hand so an empty index still produces a readable cache.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(csv_err)?;
        writer.write_record(CACHE_COLUMNS).map_err(csv_err)?;
        for record in &self.records {
            writer.serialize(record).map_err(csv_err)?;
        }
        writer.flush().map_err(|e| ToyboxError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Every 4 consecutive rows share a view index, cycling through 0..18.
///
/// This is purely positional; it only tracks frames when discovery order groups
/// each frame's rows together.
pub fn positional_view_index(row: usize) -> u32 {
    ((row / ROWS_PER_VIEW) % FRAMES_PER_ROTATION as usize) as u32
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// `<root>/*/*/*/*/*.png`, sorted by name at each level.
pub fn discover_images(root: &Path) -> DatasetResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    // No min_depth: filter_entry only sees yielded entries, and hidden
    // directories must be pruned at every level.
    let walker = WalkDir::new(root)
        .max_depth(IMAGE_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            ToyboxError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.depth() != IMAGE_DEPTH {
            continue;
        }
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("png") {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn parse_u32(raw: &str, field: &str, path: &Path) -> DatasetResult<u32> {
    raw.parse().map_err(|_| ToyboxError::MalformedPath {
        path: path.to_path_buf(),
        reason: format!("{field} {raw:?} is not an integer"),
    })
}

/// Parse `.../<ca>/<split>/<no>/<tr>_<fr>/<ratio>.png`. `view_index` is left at 0.
pub fn parse_record(path: &Path) -> DatasetResult<FileRecord> {
    let malformed = |reason: String| ToyboxError::MalformedPath {
        path: path.to_path_buf(),
        reason,
    };
    let mut segments = Vec::with_capacity(IMAGE_DEPTH);
    for component in path.components().rev() {
        if segments.len() == IMAGE_DEPTH {
            break;
        }
        if let Component::Normal(raw) = component {
            let segment = raw
                .to_str()
                .ok_or_else(|| malformed("path is not valid UTF-8".to_string()))?;
            segments.push(segment);
        }
    }
    let &[file, rotation_frame, instance, dataset, category] = segments.as_slice() else {
        return Err(malformed(format!(
            "expected {IMAGE_DEPTH} trailing path segments, found {}",
            segments.len()
        )));
    };

    let (rotation_axis, frame) = match rotation_frame.split('_').collect::<Vec<_>>().as_slice() {
        &[tr, fr] => (tr, fr),
        _ => {
            return Err(malformed(format!(
                "{rotation_frame:?} is not <rotation>_<frame>"
            )))
        }
    };
    let ratio = match file.split('.').collect::<Vec<_>>().as_slice() {
        &[ratio, _ext] => ratio,
        _ => return Err(malformed(format!("{file:?} is not <ratio>.<ext>"))),
    };

    Ok(FileRecord {
        path: path.to_path_buf(),
        dataset: dataset.to_string(),
        category: category.to_string(),
        instance: parse_u32(instance, "instance", path)?,
        rotation_axis: rotation_axis.to_string(),
        frame_index: parse_u32(frame, "frame", path)?,
        ratio: parse_u32(ratio, "ratio", path)?,
        view_index: 0,
    })
}
