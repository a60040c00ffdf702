//! Summaries of a filtered index and detection of irregular view groups.

use crate::filter::FilteredIndex;
use crate::types::GroupKey;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrregularGroup {
    pub key: GroupKey,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub rows: usize,
    pub groups: usize,
    pub per_category: BTreeMap<String, usize>,
    pub per_rotation: BTreeMap<String, usize>,
    pub per_ratio: BTreeMap<u32, usize>,
    /// Groups whose row count differs from the expected view count, sorted by key.
    pub irregular: Vec<IrregularGroup>,
}

impl IndexSummary {
    pub fn is_regular(&self) -> bool {
        self.irregular.is_empty()
    }
}

/// Count rows per category/rotation/ratio and flag groups that do not hold
/// exactly `views_per_group` rows.
pub fn summarize(index: &FilteredIndex, views_per_group: usize) -> IndexSummary {
    let mut summary = IndexSummary {
        rows: index.len(),
        groups: index.group_count(),
        ..Default::default()
    };
    for row in index.rows() {
        *summary.per_category.entry(row.category.clone()).or_default() += 1;
        *summary
            .per_rotation
            .entry(row.rotation_axis.clone())
            .or_default() += 1;
        *summary.per_ratio.entry(row.ratio).or_default() += 1;
    }
    summary.irregular = index
        .groups()
        .filter(|(_, n)| *n != views_per_group)
        .map(|(key, rows)| IrregularGroup {
            key: key.clone(),
            rows,
        })
        .collect();
    summary.irregular.sort_by(|a, b| a.key.cmp(&b.key));
    summary
}
