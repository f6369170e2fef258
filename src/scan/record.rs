//! Normalized per-section records.
//!
//! `SectionRecord` is the stable output of a scan. Fields are serialized in
//! declaration order; new fields go at the end.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::formats::elf::{Section, SectionKind};
use crate::scan::mapper::SegmentMapping;

/// Reserved section name of the per-file size record.
pub const FILESIZE_SECTION: &str = "FILESIZE";

/// Half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddrRange {
    pub start: u64,
    pub end: u64,
}

impl AddrRange {
    /// Intersection of `[a_start, a_end)` and `[b_start, b_end)`, or `None` if empty.
    pub fn intersect(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> Option<Self> {
        let start = a_start.max(b_start);
        let end = a_end.min(b_end);
        (start < end).then_some(AddrRange { start, end })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Decimal rendering used for file offsets, e.g. `4096-4352`.
    pub fn to_decimal_string(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}-{:#x}", self.start, self.end)
    }
}

/// Which address spaces a section could be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddrSpace {
    /// Inside a PT_LOAD virtual range
    #[serde(rename = "VA")]
    Va,
    /// Inside a PT_LOAD virtual range that also matches its physical range
    #[serde(rename = "VA+PA")]
    VaPa,
    /// Present in the file but not loaded
    FileOnly,
    Unknown,
}

impl AddrSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddrSpace::Va => "VA",
            AddrSpace::VaPa => "VA+PA",
            AddrSpace::FileOnly => "FileOnly",
            AddrSpace::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AddrSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a scanned binary relative to the scan root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileKey {
    /// POSIX-style relative directory, `.` for the root itself
    pub directory: String,
    pub filename: String,
}

impl FileKey {
    pub fn new(directory: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.directory == "." || self.directory.is_empty() {
            f.write_str(&self.filename)
        } else {
            write!(f, "{}/{}", self.directory, self.filename)
        }
    }
}

/// One ELF section, or the synthetic `FILESIZE` record of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub directory: String,
    pub filename: String,
    pub section_name: String,
    /// Raw `sh_type`
    pub section_type: u32,
    pub section_kind: SectionKind,
    pub size: u64,
    pub addr: u64,
    pub offset: u64,
    pub align: u64,
    pub flags_raw: u64,
    pub flags_summary: String,
    pub is_nobits: bool,
    pub in_load_segment: bool,
    /// Program header table index of the containing PT_LOAD
    pub load_segment_index: Option<usize>,
    pub load_segment_rwx: String,
    pub va_range_in_segment: Option<AddrRange>,
    pub file_range_in_segment: Option<AddrRange>,
    pub has_paddr: bool,
    pub paddr_range_in_segment: Option<AddrRange>,
    pub addr_space: AddrSpace,
}

impl SectionRecord {
    /// Build the record for a parsed section and its segment mapping.
    pub fn from_section(
        directory: &str,
        filename: &str,
        section: &Section,
        mapping: SegmentMapping,
    ) -> Self {
        let flags = section.flags();
        Self {
            directory: directory.to_string(),
            filename: filename.to_string(),
            section_name: section.name.clone(),
            section_type: section.header.sh_type,
            section_kind: section.kind(),
            size: section.header.sh_size,
            addr: section.header.sh_addr,
            offset: section.header.sh_offset,
            align: section.header.sh_addralign,
            flags_raw: section.header.sh_flags,
            flags_summary: flags.summary(),
            is_nobits: section.is_nobits(),
            in_load_segment: mapping.load_segment_index.is_some(),
            load_segment_index: mapping.load_segment_index,
            load_segment_rwx: mapping.load_segment_rwx,
            va_range_in_segment: mapping.va_range,
            file_range_in_segment: mapping.file_range,
            has_paddr: mapping.has_paddr,
            paddr_range_in_segment: mapping.paddr_range,
            addr_space: mapping.addr_space,
        }
    }

    /// The per-file `FILESIZE` record carrying the total file length.
    pub fn file_size(directory: &str, filename: &str, size: u64) -> Self {
        Self {
            directory: directory.to_string(),
            filename: filename.to_string(),
            section_name: FILESIZE_SECTION.to_string(),
            section_type: 0,
            section_kind: SectionKind::Meta,
            size,
            addr: 0,
            offset: 0,
            align: 0,
            flags_raw: 0,
            flags_summary: String::new(),
            is_nobits: false,
            in_load_segment: false,
            load_segment_index: None,
            load_segment_rwx: String::new(),
            va_range_in_segment: None,
            file_range_in_segment: None,
            has_paddr: false,
            paddr_range_in_segment: None,
            addr_space: AddrSpace::FileOnly,
        }
    }

    pub fn is_meta(&self) -> bool {
        self.section_kind == SectionKind::Meta && self.section_name == FILESIZE_SECTION
    }

    pub fn file_key(&self) -> FileKey {
        FileKey::new(self.directory.clone(), self.filename.clone())
    }

    /// Normalized type name, e.g. `PROGBITS`.
    pub fn type_name(&self) -> String {
        self.section_kind.name()
    }
}
