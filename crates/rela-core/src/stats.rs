//! Release statistics: aggregate counts over parsed change records.
//!
//! Pure fold over [`ChangeRecord`]s. Bucket maps are unordered; use the
//! `top_*` helpers for stable, report-ready rankings.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::changelog::ChangeRecord;

/// Aggregate statistics for a release range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStats {
    /// Number of change records.
    pub total_changes: usize,
    /// Number of touched paths, counted once per record that touches them.
    pub total_files_touched: usize,
    /// Lines added.
    pub total_insertions: u64,
    /// Lines removed.
    pub total_deletions: u64,
    /// Distinct author names.
    pub contributor_count: usize,
    /// Touched paths per lowercase file extension.
    pub extension_counts: HashMap<String, usize>,
    /// Touched paths per top-level directory.
    pub component_counts: HashMap<String, usize>,
}

impl ChangeStats {
    /// The `n` most common extensions, most common first.
    pub fn top_extensions(&self, n: usize) -> Vec<(&str, usize)> {
        top_n(&self.extension_counts, n)
    }

    /// The `n` most touched top-level components, most touched first.
    pub fn top_components(&self, n: usize) -> Vec<(&str, usize)> {
        top_n(&self.component_counts, n)
    }
}

/// Aggregate statistics over `records`.
pub fn aggregate(records: &[ChangeRecord]) -> ChangeStats {
    let mut stats = ChangeStats::default();
    let mut authors = HashSet::new();

    for record in records {
        stats.total_changes += 1;
        stats.total_files_touched += record.files.len();
        stats.total_insertions = stats.total_insertions.saturating_add(record.insertions);
        stats.total_deletions = stats.total_deletions.saturating_add(record.deletions);
        authors.insert(record.author.as_str());

        for path in &record.files {
            if let Some((_, ext)) = path.rsplit_once('.') {
                *stats.extension_counts.entry(ext.to_lowercase()).or_default() += 1;
            }
            if let Some((component, _)) = path.split_once('/') {
                *stats
                    .component_counts
                    .entry(component.to_string())
                    .or_default() += 1;
            }
        }
    }

    stats.contributor_count = authors.len();
    stats
}

/// The `n` records with the most churn, largest first.
///
/// Equal churn keeps log order.
pub fn significant_changes(records: &[ChangeRecord], n: usize) -> Vec<&ChangeRecord> {
    let mut ranked: Vec<&ChangeRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.churn().cmp(&a.churn()));
    ranked.truncate(n);
    ranked
}

fn top_n(counts: &HashMap<String, usize>, n: usize) -> Vec<(&str, usize)> {
    let mut entries: Vec<(&str, usize)> = counts
        .iter()
        .map(|(label, count)| (label.as_str(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries.truncate(n);
    entries
}
