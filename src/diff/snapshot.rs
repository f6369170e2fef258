//! Per-file, per-group aggregates of one classified scan.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::ClassifiedRecord;
use crate::scan::record::FileKey;

/// Size and record count of one group within one file (or snapshot).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupTotal {
    pub size: u64,
    pub records: usize,
}

impl GroupTotal {
    fn add(&mut self, size: u64) {
        self.size = self.size.saturating_add(size);
        self.records += 1;
    }

    fn merge(&mut self, other: &GroupTotal) {
        self.size = self.size.saturating_add(other.size);
        self.records += other.records;
    }
}

/// Aggregates for one binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileTotals {
    /// From the FILESIZE record, when present
    pub file_size: Option<u64>,
    /// Sum of all section sizes
    pub section_sum: u64,
    pub groups: BTreeMap<String, GroupTotal>,
}

impl FileTotals {
    /// Whole-file size, falling back to the section sum.
    pub fn size(&self) -> u64 {
        self.file_size.unwrap_or(self.section_sum)
    }

    pub fn group_size(&self, group: &str) -> Option<u64> {
        self.groups.get(group).map(|g| g.size)
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    files: BTreeMap<FileKey, FileTotals>,
}

impl Snapshot {
    /// The FILESIZE record sets the file size and is kept out of every group.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ClassifiedRecord>,
    {
        let mut files: BTreeMap<FileKey, FileTotals> = BTreeMap::new();
        for classified in records {
            let rec = &classified.record;
            let totals = files.entry(rec.file_key()).or_default();
            if rec.is_meta() {
                totals.file_size = Some(rec.size);
                continue;
            }
            totals.section_sum = totals.section_sum.saturating_add(rec.size);
            totals
                .groups
                .entry(classified.group.clone())
                .or_default()
                .add(rec.size);
        }
        Self { files }
    }

    pub fn file(&self, key: &FileKey) -> Option<&FileTotals> {
        self.files.get(key)
    }

    pub fn contains(&self, key: &FileKey) -> bool {
        self.files.contains_key(key)
    }

    /// Files in key order.
    pub fn files(&self) -> impl Iterator<Item = (&FileKey, &FileTotals)> + '_ {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Group totals over the given subset of files.
    pub fn group_totals<'k, I>(&self, keys: I) -> BTreeMap<String, GroupTotal>
    where
        I: IntoIterator<Item = &'k FileKey>,
    {
        let mut out: BTreeMap<String, GroupTotal> = BTreeMap::new();
        for key in keys {
            if let Some(file) = self.files.get(key) {
                for (group, total) in &file.groups {
                    out.entry(group.clone()).or_default().merge(total);
                }
            }
        }
        out
    }
}
