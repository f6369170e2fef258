//! elfdelta: ELF section/segment scanning, rule-based size classification
//! and snapshot diffing.
//!
//! ```no_run
//! use elfdelta::{classify_records, diff_records, scan_directory, AnalysisConfig, Profile};
//! use std::path::Path;
//!
//! let cfg = AnalysisConfig::default();
//! let groups = Profile::Berkeley.config();
//! let old = scan_directory(Path::new("old"), &cfg.scan)?;
//! let new = scan_directory(Path::new("new"), &cfg.scan)?;
//! let diff = diff_records(
//!     &classify_records(old.records, groups),
//!     &classify_records(new.records, groups),
//!     &cfg.diff,
//! );
//! for row in &diff.groups {
//!     println!("{} {} -> {} ({:+.1}%)", row.key, row.old_value, row.new_value, row.delta_percent);
//! }
//! # Ok::<(), elfdelta::ElfDeltaError>(())
//! ```

/// Section classification
pub mod classify;
/// Run configuration
pub mod config;
/// Snapshot comparison
pub mod diff;
pub mod error;
/// Binary format parsing
pub mod formats;
pub mod io;
pub mod logging;
/// Directory and file scanning
pub mod scan;

pub use classify::{classify, classify_records, ClassifiedRecord, GroupConfig, Profile};
pub use config::{AnalysisConfig, DiffConfig, ScanConfig};
pub use diff::{
    diff_records, diff_snapshots, DiffEntry, DiffStatus, FileSelection, Snapshot, SnapshotDiff,
    SortKey,
};
pub use error::{ElfDeltaError, Result};
pub use scan::{
    scan_directory, scan_directory_with_cancel, scan_file, AddrSpace, CancelToken, ScanReport,
    SectionRecord,
};
