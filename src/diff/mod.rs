//! Snapshot comparison.
//!
//! Two classified scans are compared per group and per file. File selection
//! happens first, so group totals only cover the selected files. Files
//! missing on one side count as zero on that side.

pub mod rank;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

pub use rank::SortKey;
pub use snapshot::{FileTotals, GroupTotal, Snapshot};

use crate::classify::ClassifiedRecord;
use crate::config::DiffConfig;
use crate::error::ElfDeltaError;
use crate::scan::record::FileKey;

/// Which files take part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileSelection {
    /// Files present in both snapshots
    #[serde(rename = "common")]
    Common,
    /// Every file from either snapshot
    #[serde(rename = "all")]
    All,
    /// Files present in exactly one snapshot
    #[serde(rename = "added+removed")]
    AddedRemoved,
}

impl FileSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileSelection::Common => "common",
            FileSelection::All => "all",
            FileSelection::AddedRemoved => "added+removed",
        }
    }

    pub fn includes(&self, in_old: bool, in_new: bool) -> bool {
        match self {
            FileSelection::Common => in_old && in_new,
            FileSelection::All => in_old || in_new,
            FileSelection::AddedRemoved => in_old != in_new,
        }
    }
}

impl fmt::Display for FileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileSelection {
    type Err = ElfDeltaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "common" => Ok(FileSelection::Common),
            "all" => Ok(FileSelection::All),
            "added+removed" => Ok(FileSelection::AddedRemoved),
            other => Err(ElfDeltaError::config(format!(
                "unknown file selection: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Common,
    Added,
    Removed,
}

impl DiffStatus {
    pub fn from_presence(in_old: bool, in_new: bool) -> Self {
        match (in_old, in_new) {
            (true, false) => DiffStatus::Removed,
            (false, true) => DiffStatus::Added,
            _ => DiffStatus::Common,
        }
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiffStatus::Common => "common",
            DiffStatus::Added => "added",
            DiffStatus::Removed => "removed",
        })
    }
}

/// Percentage change from `old` to `new`; always finite.
pub fn percent_change(old: u64, new: u64) -> f64 {
    if old == 0 {
        if new == 0 {
            0.0
        } else {
            100.0
        }
    } else {
        (new as f64 - old as f64) * 100.0 / old as f64
    }
}

/// `new - old`, clamped to the `i64` range.
fn signed_delta(old: u64, new: u64) -> i64 {
    let wide = i128::from(new) - i128::from(old);
    wide.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// One comparison row, for a group or a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    /// Group name, or the `dir/filename` file key
    pub key: String,
    pub old_value: u64,
    pub new_value: u64,
    pub delta: i64,
    pub delta_percent: f64,
    pub status: DiffStatus,
}

impl DiffEntry {
    pub fn new(key: impl Into<String>, old_value: u64, new_value: u64, status: DiffStatus) -> Self {
        let delta = signed_delta(old_value, new_value);
        Self {
            key: key.into(),
            old_value,
            new_value,
            delta,
            delta_percent: percent_change(old_value, new_value),
            status,
        }
    }

    pub fn abs_delta(&self) -> u64 {
        self.delta.unsigned_abs()
    }
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDiff {
    pub selection: FileSelection,
    /// Group rows, by group name
    pub groups: Vec<DiffEntry>,
    /// File rows, by file key
    pub files: Vec<DiffEntry>,
    /// Per group, the file rows restricted to that group's sections
    pub group_files: BTreeMap<String, Vec<DiffEntry>>,
}

impl SnapshotDiff {
    pub fn group(&self, name: &str) -> Option<&DiffEntry> {
        self.groups.iter().find(|e| e.key == name)
    }

    pub fn file(&self, key: &str) -> Option<&DiffEntry> {
        self.files.iter().find(|e| e.key == key)
    }

    pub fn group_files(&self, group: &str) -> &[DiffEntry] {
        self.group_files
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum over all group rows.
    pub fn total(&self) -> DiffEntry {
        let old: u64 = self.groups.iter().map(|e| e.old_value).sum();
        let new: u64 = self.groups.iter().map(|e| e.new_value).sum();
        DiffEntry::new("TOTAL", old, new, DiffStatus::Common)
    }
}

/// Compare two snapshots over the files picked by `selection`.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot, selection: FileSelection) -> SnapshotDiff {
    let _span = crate::span_trace!("diff_snapshots", selection = %selection).entered();

    let union: BTreeSet<&FileKey> = old.files().chain(new.files()).map(|(k, _)| k).collect();
    let selected: Vec<&FileKey> = union
        .into_iter()
        .filter(|k| selection.includes(old.contains(k), new.contains(k)))
        .collect();

    let files: Vec<DiffEntry> = selected
        .iter()
        .map(|key| {
            let o = old.file(key);
            let n = new.file(key);
            DiffEntry::new(
                key.to_string(),
                o.map(FileTotals::size).unwrap_or(0),
                n.map(FileTotals::size).unwrap_or(0),
                DiffStatus::from_presence(o.is_some(), n.is_some()),
            )
        })
        .collect();

    let old_groups = old.group_totals(selected.iter().copied());
    let new_groups = new.group_totals(selected.iter().copied());
    let names: BTreeSet<&String> = old_groups.keys().chain(new_groups.keys()).collect();

    let mut groups = Vec::with_capacity(names.len());
    let mut group_files = BTreeMap::new();
    for name in names {
        let o = old_groups.get(name);
        let n = new_groups.get(name);
        groups.push(DiffEntry::new(
            name.clone(),
            o.map(|t| t.size).unwrap_or(0),
            n.map(|t| t.size).unwrap_or(0),
            DiffStatus::from_presence(o.is_some(), n.is_some()),
        ));

        let rows: Vec<DiffEntry> = selected
            .iter()
            .filter_map(|key| {
                let o = old.file(key).and_then(|f| f.group_size(name));
                let n = new.file(key).and_then(|f| f.group_size(name));
                if o.is_none() && n.is_none() {
                    return None;
                }
                Some(DiffEntry::new(
                    key.to_string(),
                    o.unwrap_or(0),
                    n.unwrap_or(0),
                    DiffStatus::from_presence(o.is_some(), n.is_some()),
                ))
            })
            .collect();
        group_files.insert(name.clone(), rows);
    }

    debug!(
        files = files.len(),
        groups = groups.len(),
        "Compared snapshots"
    );

    SnapshotDiff {
        selection,
        groups,
        files,
        group_files,
    }
}

/// Aggregate, compare, then rank and truncate per `config`.
pub fn diff_records(
    old: &[ClassifiedRecord],
    new: &[ClassifiedRecord],
    config: &DiffConfig,
) -> SnapshotDiff {
    let old = Snapshot::from_records(old);
    let new = Snapshot::from_records(new);
    let diff = diff_snapshots(&old, &new, config.selection);
    let total = diff.total();
    info!(
        old_files = old.len(),
        new_files = new.len(),
        old_total = total.old_value,
        new_total = total.new_value,
        delta = total.delta,
        "Snapshot diff"
    );
    rank::apply(diff, config)
}
