//! Directory scanning.
//!
//! Walks a root directory, keeps files carrying the ELF magic, and turns each
//! one into a `FILESIZE` record followed by one record per section header.
//! Failures are isolated per file and reported in the `ScanReport`.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::config::ScanConfig;
use crate::error::{ElfDeltaError, Result};
use crate::formats::elf::{self, ElfParser};
use crate::formats::sniff::{sniff_bytes, sniff_path, Magic, OtherFormat};
use crate::io::error::IoError;
use crate::io::SafeReader;
use crate::scan::mapper::SectionMapper;
use crate::scan::record::SectionRecord;

/// Stops a running scan from dispatching further files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What happened to one ELF candidate.
#[derive(Debug)]
pub enum FileOutcome {
    /// Records were emitted; `sections` excludes the FILESIZE record.
    Parsed { sections: usize },
    Failed { error: ElfDeltaError },
}

#[derive(Debug)]
pub struct FileScan {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileScan {
    pub fn is_parsed(&self) -> bool {
        matches!(self.outcome, FileOutcome::Parsed { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Every directory entry visited, directories included
    pub total_entries: usize,
    pub regular_files: usize,
    pub elf_candidates: usize,
    pub macho_candidates: usize,
    pub parsed: usize,
    pub failed: usize,
    /// Candidates never dispatched because the scan was cancelled
    pub skipped: usize,
}

/// Informational condition for scans that produced no ELF records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormatNotice {
    /// Binaries were found, but all of them are Mach-O.
    MachOOnly { count: usize },
    NoBinaries,
}

/// Accumulated size of one section name across a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionTotal {
    pub name: String,
    pub total: u64,
    pub count: usize,
}

/// Result of scanning one root directory.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub root: PathBuf,
    /// Grouped by file in walk order, sections in header order
    pub records: Vec<SectionRecord>,
    pub files: Vec<FileScan>,
    pub stats: ScanStats,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn format_notice(&self) -> Option<FormatNotice> {
        if self.stats.elf_candidates > 0 {
            return None;
        }
        if self.stats.macho_candidates > 0 {
            Some(FormatNotice::MachOOnly {
                count: self.stats.macho_candidates,
            })
        } else {
            Some(FormatNotice::NoBinaries)
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ElfDeltaError)> + '_ {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Failed { error } => Some((f.path.as_path(), error)),
            FileOutcome::Parsed { .. } => None,
        })
    }

    /// Per-name size totals over all section records, largest first.
    pub fn section_summary(&self) -> Vec<SectionTotal> {
        let mut totals: HashMap<&str, (u64, usize)> = HashMap::new();
        for rec in self.records.iter().filter(|r| !r.is_meta()) {
            let entry = totals.entry(rec.section_name.as_str()).or_default();
            entry.0 += rec.size;
            entry.1 += 1;
        }
        let mut summary: Vec<SectionTotal> = totals
            .into_iter()
            .map(|(name, (total, count))| SectionTotal {
                name: name.to_string(),
                total,
                count,
            })
            .collect();
        summary.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        summary
    }
}

/// Build the records of one in-memory ELF image.
pub fn image_records(
    data: &[u8],
    directory: &str,
    filename: &str,
    alloc_only_mapping: bool,
) -> elf::Result<Vec<SectionRecord>> {
    let parsed = ElfParser::parse(data)?;
    let mapper = SectionMapper::from_table(parsed.segments(), alloc_only_mapping);

    let mut records = Vec::with_capacity(parsed.sections().count() + 1);
    records.push(SectionRecord::file_size(
        directory,
        filename,
        data.len() as u64,
    ));
    for section in parsed.sections().sections() {
        let mapping = mapper.map(&section.header);
        records.push(SectionRecord::from_section(
            directory, filename, section, mapping,
        ));
    }
    Ok(records)
}

/// POSIX-style directory of `path` relative to `root`, `.` for the root.
pub fn relative_directory(path: &Path, root: &Path) -> String {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let rel = parent.strip_prefix(root).unwrap_or(parent);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Scan a single file. `root` only determines the record's directory.
pub fn scan_file(path: &Path, root: &Path, config: &ScanConfig) -> Result<Vec<SectionRecord>> {
    let _span = crate::span_trace!("scan_file", path = %path.display()).entered();

    let reader = SafeReader::open(path, config.max_file_size).map_err(|source| {
        ElfDeltaError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let data = reader.bytes();

    match sniff_bytes(data) {
        Magic::Elf => {}
        Magic::Other(other) => {
            return Err(ElfDeltaError::NotElf {
                path: path.to_path_buf(),
                other_format: Some(other),
            })
        }
        Magic::Unknown => {
            return Err(ElfDeltaError::NotElf {
                path: path.to_path_buf(),
                other_format: None,
            })
        }
    }

    let directory = relative_directory(path, root);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let records = image_records(data, &directory, &filename, config.alloc_only_mapping)
        .map_err(|source| ElfDeltaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        path = %path.display(),
        sections = records.len() - 1,
        "Parsed ELF file"
    );
    Ok(records)
}

/// Scan every ELF file under `root`.
pub fn scan_directory(root: &Path, config: &ScanConfig) -> Result<ScanReport> {
    scan_directory_with_cancel(root, config, &CancelToken::new())
}

/// Like [`scan_directory`], checking `cancel` before each file is dispatched.
///
/// Only an unreadable root is an error; everything below it is reported
/// per file.
pub fn scan_directory_with_cancel(
    root: &Path,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<ScanReport> {
    let _span = crate::span_trace!("scan_directory", root = %root.display()).entered();

    let mut walk = Walk::default();
    walk.visit(root, config, true)
        .map_err(|e| ElfDeltaError::Io {
            path: root.to_path_buf(),
            source: IoError::from(e),
        })?;

    let Walk {
        candidates,
        mut files,
        mut stats,
        ..
    } = walk;

    let process = |path: &PathBuf| -> Option<(FileScan, Vec<SectionRecord>)> {
        if cancel.is_cancelled() {
            return None;
        }
        Some(match scan_file(path, root, config) {
            Ok(records) => (
                FileScan {
                    path: path.clone(),
                    outcome: FileOutcome::Parsed {
                        sections: records.len().saturating_sub(1),
                    },
                },
                records,
            ),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Skipping file");
                (
                    FileScan {
                        path: path.clone(),
                        outcome: FileOutcome::Failed { error },
                    },
                    Vec::new(),
                )
            }
        })
    };

    let results: Vec<Option<(FileScan, Vec<SectionRecord>)>> = if !config.parallel {
        candidates.iter().map(process).collect::<Vec<_>>()
    } else if config.threads > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => pool.install(|| candidates.par_iter().map(process).collect::<Vec<_>>()),
            Err(e) => {
                warn!(error = %e, "Falling back to the global rayon pool");
                candidates.par_iter().map(process).collect::<Vec<_>>()
            }
        }
    } else {
        candidates.par_iter().map(process).collect::<Vec<_>>()
    };

    let mut records = Vec::new();
    for result in results {
        match result {
            Some((scan, mut recs)) => {
                if scan.is_parsed() {
                    stats.parsed += 1;
                } else {
                    stats.failed += 1;
                }
                records.append(&mut recs);
                files.push(scan);
            }
            None => stats.skipped += 1,
        }
    }

    let cancelled = cancel.is_cancelled();
    info!(
        root = %root.display(),
        entries = stats.total_entries,
        elf = stats.elf_candidates,
        parsed = stats.parsed,
        failed = stats.failed,
        records = records.len(),
        cancelled,
        "Scan finished"
    );

    let report = ScanReport {
        root: root.to_path_buf(),
        records,
        files,
        stats,
        cancelled,
    };
    match report.format_notice() {
        Some(FormatNotice::MachOOnly { count }) => {
            info!(count, "No ELF files found, but Mach-O binaries are present")
        }
        Some(FormatNotice::NoBinaries) => info!("No ELF or Mach-O binaries found"),
        None => {}
    }
    Ok(report)
}

#[derive(Default)]
struct Walk {
    candidates: Vec<PathBuf>,
    // Files that failed before dispatch (unreadable for sniffing)
    files: Vec<FileScan>,
    stats: ScanStats,
    // Canonical directories already walked; breaks symlink cycles
    visited: HashSet<PathBuf>,
}

impl Walk {
    fn visit(&mut self, dir: &Path, config: &ScanConfig, is_root: bool) -> std::io::Result<()> {
        if let Ok(canonical) = fs::canonicalize(dir) {
            if !self.visited.insert(canonical) {
                debug!(path = %dir.display(), "Directory already visited");
                return Ok(());
            }
        }
        let mut entries = match fs::read_dir(dir) {
            Ok(rd) => rd.filter_map(|e| e.ok()).collect::<Vec<_>>(),
            Err(e) if is_root => return Err(e),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Cannot read directory");
                return Ok(());
            }
        };
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            self.stats.total_entries += 1;
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            let (is_dir, is_file) = if file_type.is_symlink() {
                if !config.follow_symlinks {
                    trace!(path = %path.display(), "Skipping symlink");
                    continue;
                }
                match fs::metadata(&path) {
                    Ok(meta) => (meta.is_dir(), meta.is_file()),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Dangling symlink");
                        continue;
                    }
                }
            } else {
                (file_type.is_dir(), file_type.is_file())
            };

            if is_dir {
                self.visit(&path, config, false)?;
            } else if is_file {
                self.stats.regular_files += 1;
                self.classify_file(path);
            }
        }
        Ok(())
    }

    fn classify_file(&mut self, path: PathBuf) {
        match sniff_path(&path) {
            Ok(Magic::Elf) => {
                self.stats.elf_candidates += 1;
                self.candidates.push(path);
            }
            Ok(Magic::Other(OtherFormat::MachO32 | OtherFormat::MachO64)) => {
                debug!(path = %path.display(), "Mach-O binary, not scanned");
                self.stats.macho_candidates += 1;
            }
            Ok(Magic::Unknown) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read file");
                self.stats.failed += 1;
                self.files.push(FileScan {
                    outcome: FileOutcome::Failed {
                        error: ElfDeltaError::Io {
                            path: path.clone(),
                            source: IoError::from(e),
                        },
                    },
                    path,
                });
            }
        }
    }
}
