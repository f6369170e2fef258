//! Run configuration.
//!
//! Scanner and differ settings with defaults that match a plain
//! "scan two trees and compare" run. Documents are JSON; every field is
//! optional.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::diff::rank::SortKey;
use crate::diff::FileSelection;
use crate::error::{ElfDeltaError, Result};
use crate::io::DEFAULT_MAX_FILE_SIZE;

/// Master configuration for a scan/diff run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Directory walking and per-file parsing.
    pub scan: ScanConfig,
    /// Snapshot comparison and ranking.
    pub diff: DiffConfig,
}

impl AnalysisConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(ElfDeltaError::from)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ElfDeltaError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }
}

/// Scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Files larger than this are skipped with an I/O error.
    pub max_file_size: u64,
    /// Descend into symlinked directories and read symlinked files.
    pub follow_symlinks: bool,
    /// Parse files on the rayon pool.
    pub parallel: bool,
    /// Worker count; 0 uses the global rayon pool.
    pub threads: usize,
    /// Only SHF_ALLOC sections are matched against PT_LOAD ranges. Off by
    /// default, so any section whose address range overlaps a PT_LOAD is in it.
    pub alloc_only_mapping: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            follow_symlinks: false,
            parallel: true,
            threads: 0,
            alloc_only_mapping: false,
        }
    }
}

/// Differ settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    pub selection: FileSelection,
    pub sort: SortKey,
    /// 0 keeps every group.
    pub top_n_groups: usize,
    /// Applies to the file list and to each group's file list; 0 keeps all.
    pub top_n_files: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            selection: FileSelection::All,
            sort: SortKey::AbsDiff,
            top_n_groups: 0,
            top_n_files: 10,
        }
    }
}
