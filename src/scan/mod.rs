//! Section/segment scanning: per-file records for every ELF under a root.

pub mod emitter;
pub mod mapper;
pub mod record;

pub use emitter::{
    image_records, scan_directory, scan_directory_with_cancel, scan_file, CancelToken,
    FileOutcome, FileScan, FormatNotice, ScanReport, ScanStats, SectionTotal,
};
pub use mapper::{LoadSegment, SectionMapper, SegmentMapping};
pub use record::{AddrRange, AddrSpace, FileKey, SectionRecord, FILESIZE_SECTION};
