//! Narrowing a split's rows by rotation, view and ratio.

use crate::types::{FileRecord, GroupKey, FRAMES_PER_ROTATION};
use std::collections::HashMap;

/// `nview` indices evenly spaced over `0..=17`, both ends included, rounded to
/// the nearest integer. `0` means "no view constraint".
///
/// Rounding differs from truncating selections made elsewhere: `nview = 6` gives
/// `[0, 3, 7, 10, 14, 17]` here, where truncation gives `[0, 3, 6, 10, 13, 17]`.
pub fn sample_view_indices(nview: usize) -> Option<Vec<u32>> {
    let last = FRAMES_PER_ROTATION - 1;
    match nview {
        0 => None,
        1 => Some(vec![0]),
        n => Some(
            (0..n)
                .map(|i| (i as f64 * last as f64 / (n - 1) as f64).round() as u32)
                .collect(),
        ),
    }
}

/// Row constraints. A `None` field does not constrain anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexFilter {
    pub rotation_axes: Option<Vec<String>>,
    pub view_indices: Option<Vec<u32>>,
    pub ratios: Option<Vec<u32>>,
}

impl IndexFilter {
    pub fn matches(&self, record: &FileRecord) -> bool {
        self.rotation_axes
            .as_ref()
            .map_or(true, |axes| axes.iter().any(|a| *a == record.rotation_axis))
            && self
                .view_indices
                .as_ref()
                .map_or(true, |views| views.contains(&record.view_index))
            && self
                .ratios
                .as_ref()
                .map_or(true, |ratios| ratios.contains(&record.ratio))
    }

    /// Keep matching rows in their incoming relative order.
    pub fn apply<'a, I>(&self, records: I) -> FilteredIndex
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        FilteredIndex::new(
            records
                .into_iter()
                .filter(|r| self.matches(r))
                .cloned()
                .collect(),
        )
    }
}

/// The rows backing a dataset, numbered densely from 0, with group lookup.
#[derive(Debug, Clone, Default)]
pub struct FilteredIndex {
    rows: Vec<FileRecord>,
    groups: HashMap<GroupKey, Vec<usize>>,
}

impl FilteredIndex {
    pub fn new(rows: Vec<FileRecord>) -> Self {
        let mut groups: HashMap<GroupKey, Vec<usize>> = HashMap::new();
        for (pos, row) in rows.iter().enumerate() {
            groups.entry(row.group_key()).or_default().push(pos);
        }
        Self { rows, groups }
    }

    pub fn rows(&self) -> &[FileRecord] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&FileRecord> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows sharing `key`, in filtered order.
    pub fn group(&self, key: &GroupKey) -> Vec<&FileRecord> {
        self.groups
            .get(key)
            .map(|positions| positions.iter().map(|&p| &self.rows[p]).collect())
            .unwrap_or_default()
    }

    /// Rows sharing the group of row `index`, in filtered order.
    pub fn group_of(&self, index: usize) -> Vec<&FileRecord> {
        self.rows
            .get(index)
            .map(|row| self.group(&row.group_key()))
            .unwrap_or_default()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, usize)> {
        self.groups.iter().map(|(k, v)| (k, v.len()))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
