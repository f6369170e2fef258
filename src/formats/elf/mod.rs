//! ELF (Executable and Linkable Format) structural parser
//!
//! Decodes the ELF header, the section header table and the program header
//! table of a single image. Only what the section/segment mapper needs is
//! decoded; symbol tables, relocations and debug info are never touched.

pub mod headers;
pub mod sections;
pub mod segments;
pub mod types;
pub mod utils;

use headers::parse_header;
use sections::SectionTable;
use segments::SegmentTable;
pub use types::*;

/// Parsed ELF image
#[derive(Debug, Clone)]
pub struct ElfParser {
    header: ElfHeader,
    sections: SectionTable,
    segments: SegmentTable,
}

impl ElfParser {
    /// Parse ELF from raw data
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = parse_header(data)?;
        let sections = SectionTable::parse(data, &header)?;
        let segments = SegmentTable::parse(data, &header, sections.extended_phnum())?;

        Ok(Self {
            header,
            sections,
            segments,
        })
    }

    /// Get ELF header
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// Get sections
    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// Get segments
    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }
}
