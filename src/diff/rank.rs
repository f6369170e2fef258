//! Ordering and Top-N truncation of diff rows.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::config::DiffConfig;
use crate::diff::{DiffEntry, SnapshotDiff};
use crate::error::ElfDeltaError;

/// Row ordering. Metrics sort descending, `Name` ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortKey {
    /// `absdiff`: largest change either way
    AbsDiff,
    /// `diff`: largest growth first, largest shrink last
    Diff,
    Old,
    New,
    /// `diff%`
    DiffPercent,
    Name,
    /// `+diff`: growing (or unchanged) rows only
    Increase,
    /// `-diff`: shrinking (or unchanged) rows only, largest shrink first
    Decrease,
    /// `abs_diff_pct`: largest relative change either way
    AbsDiffPercent,
    /// `+diff_pct`: rows with a non-negative percentage, highest first
    IncreasePercent,
    /// `-diff_pct`: rows with a non-positive percentage, lowest first
    DecreasePercent,
}

impl SortKey {
    pub const ALL: [SortKey; 11] = [
        SortKey::AbsDiff,
        SortKey::Diff,
        SortKey::Old,
        SortKey::New,
        SortKey::DiffPercent,
        SortKey::Name,
        SortKey::Increase,
        SortKey::Decrease,
        SortKey::AbsDiffPercent,
        SortKey::IncreasePercent,
        SortKey::DecreasePercent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::AbsDiff => "absdiff",
            SortKey::Diff => "diff",
            SortKey::Old => "old",
            SortKey::New => "new",
            SortKey::DiffPercent => "diff%",
            SortKey::Name => "name",
            SortKey::Increase => "+diff",
            SortKey::Decrease => "-diff",
            SortKey::AbsDiffPercent => "abs_diff_pct",
            SortKey::IncreasePercent => "+diff_pct",
            SortKey::DecreasePercent => "-diff_pct",
        }
    }

    /// Whether a row survives the signed filters.
    pub fn keeps(&self, entry: &DiffEntry) -> bool {
        match self {
            SortKey::Increase => entry.delta >= 0,
            SortKey::Decrease => entry.delta <= 0,
            SortKey::IncreasePercent => entry.delta_percent >= 0.0,
            SortKey::DecreasePercent => entry.delta_percent <= 0.0,
            _ => true,
        }
    }

    pub fn compare(&self, a: &DiffEntry, b: &DiffEntry) -> Ordering {
        let primary = match self {
            SortKey::AbsDiff | SortKey::Increase | SortKey::Decrease => {
                b.abs_delta().cmp(&a.abs_delta())
            }
            SortKey::Diff => b.delta.cmp(&a.delta),
            SortKey::Old => b.old_value.cmp(&a.old_value),
            SortKey::New => b.new_value.cmp(&a.new_value),
            SortKey::DiffPercent | SortKey::IncreasePercent => {
                b.delta_percent.total_cmp(&a.delta_percent)
            }
            SortKey::DecreasePercent => a.delta_percent.total_cmp(&b.delta_percent),
            SortKey::AbsDiffPercent => b.delta_percent.abs().total_cmp(&a.delta_percent.abs()),
            SortKey::Name => Ordering::Equal,
        };
        primary.then_with(|| a.key.cmp(&b.key))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ElfDeltaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ElfDeltaError::config(format!("unknown sort key: {}", s)))
    }
}

impl TryFrom<String> for SortKey {
    type Error = ElfDeltaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> String {
        key.as_str().to_string()
    }
}

/// Keep the first `n` rows; 0 keeps everything.
pub fn top_n(mut entries: Vec<DiffEntry>, n: usize) -> Vec<DiffEntry> {
    if n > 0 {
        entries.truncate(n);
    }
    entries
}

/// Filter, order and truncate rows.
pub fn rank(entries: Vec<DiffEntry>, key: SortKey, n: usize) -> Vec<DiffEntry> {
    let mut kept: Vec<DiffEntry> = entries.into_iter().filter(|e| key.keeps(e)).collect();
    kept.sort_by(|a, b| key.compare(a, b));
    top_n(kept, n)
}

/// Rank groups, files and each kept group's file list.
pub fn apply(diff: SnapshotDiff, config: &DiffConfig) -> SnapshotDiff {
    let SnapshotDiff {
        selection,
        groups,
        files,
        mut group_files,
    } = diff;

    let groups = rank(groups, config.sort, config.top_n_groups);
    let files = rank(files, config.sort, config.top_n_files);
    group_files.retain(|name, _| groups.iter().any(|g| &g.key == name));
    for rows in group_files.values_mut() {
        *rows = rank(std::mem::take(rows), config.sort, config.top_n_files);
    }

    SnapshotDiff {
        selection,
        groups,
        files,
        group_files,
    }
}
