//! Section to PT_LOAD segment mapping.
//!
//! For every section the mapper finds the first PT_LOAD (in program header
//! table order) whose virtual range overlaps the section, then derives the
//! file-offset and physical-address intersections and the address space.

use crate::formats::elf::segments::SegmentTable;
use crate::formats::elf::{SectionFlags, SectionHeader, Segment, SegmentFlags, SHT_NOBITS};
use crate::scan::record::{AddrRange, AddrSpace};

/// A PT_LOAD entry reduced to what the mapper needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    /// Index in the program header table
    pub index: usize,
    pub virtual_start: u64,
    pub virtual_size: u64,
    /// Set when `p_paddr` and `p_memsz` are both non-zero
    pub physical_start: Option<u64>,
    pub file_start: u64,
    pub file_size: u64,
    pub permissions: SegmentFlags,
}

impl LoadSegment {
    /// Returns `None` for anything that is not PT_LOAD.
    pub fn from_segment(segment: &Segment) -> Option<Self> {
        if !segment.is_load() {
            return None;
        }
        let ph = &segment.header;
        let physical_start = (ph.p_paddr != 0 && ph.p_memsz != 0).then_some(ph.p_paddr);
        Some(Self {
            index: segment.index,
            virtual_start: ph.p_vaddr,
            virtual_size: ph.p_memsz,
            physical_start,
            file_start: ph.p_offset,
            file_size: ph.p_filesz,
            permissions: segment.flags(),
        })
    }

    pub fn virtual_end(&self) -> u64 {
        self.virtual_start.saturating_add(self.virtual_size)
    }

    pub fn file_end(&self) -> u64 {
        self.file_start.saturating_add(self.file_size)
    }

    pub fn physical_range(&self) -> Option<(u64, u64)> {
        self.physical_start
            .map(|start| (start, start.saturating_add(self.virtual_size)))
    }
}

/// Mapping outcome for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMapping {
    pub load_segment_index: Option<usize>,
    pub load_segment_rwx: String,
    pub va_range: Option<AddrRange>,
    pub file_range: Option<AddrRange>,
    pub has_paddr: bool,
    pub paddr_range: Option<AddrRange>,
    pub addr_space: AddrSpace,
}

impl SegmentMapping {
    fn unmapped(addr_space: AddrSpace) -> Self {
        Self {
            load_segment_index: None,
            load_segment_rwx: String::new(),
            va_range: None,
            file_range: None,
            has_paddr: false,
            paddr_range: None,
            addr_space,
        }
    }
}

/// Maps the sections of one file onto that file's PT_LOAD segments.
#[derive(Debug, Clone, Default)]
pub struct SectionMapper {
    loads: Vec<LoadSegment>,
    alloc_only: bool,
}

impl SectionMapper {
    pub fn new(loads: Vec<LoadSegment>, alloc_only: bool) -> Self {
        Self { loads, alloc_only }
    }

    /// Collect the PT_LOAD entries of a program header table, in table order.
    pub fn from_table(table: &SegmentTable, alloc_only: bool) -> Self {
        let loads = table
            .load_segments()
            .filter_map(LoadSegment::from_segment)
            .collect();
        Self::new(loads, alloc_only)
    }

    pub fn loads(&self) -> &[LoadSegment] {
        &self.loads
    }

    /// Place one section. An unmapped NOBITS section is `Unknown` whatever its
    /// `sh_offset`, since it has neither a segment address nor file bytes.
    pub fn map(&self, header: &SectionHeader) -> SegmentMapping {
        let is_nobits = header.sh_type == SHT_NOBITS;
        let start = header.sh_addr;
        let end = start.saturating_add(header.sh_size);

        let eligible = !self.alloc_only
            || SectionFlags::from_bits_retain(header.sh_flags).contains(SectionFlags::ALLOC);

        let hit = if eligible {
            self.loads.iter().find_map(|seg| {
                AddrRange::intersect(start, end, seg.virtual_start, seg.virtual_end())
                    .map(|va| (seg, va))
            })
        } else {
            None
        };

        // NOBITS has no file bytes whatever its sh_offset
        let Some((seg, va)) = hit else {
            let space = if header.sh_offset != 0 && !is_nobits {
                AddrSpace::FileOnly
            } else {
                AddrSpace::Unknown
            };
            return SegmentMapping::unmapped(space);
        };

        let (file_range, paddr_range) = if is_nobits {
            (None, None)
        } else {
            let file_start = header.sh_offset;
            let file_end = file_start.saturating_add(header.sh_size);
            let file_range =
                AddrRange::intersect(file_start, file_end, seg.file_start, seg.file_end());
            let paddr_range = seg
                .physical_range()
                .and_then(|(pa_start, pa_end)| AddrRange::intersect(start, end, pa_start, pa_end));
            (file_range, paddr_range)
        };

        SegmentMapping {
            load_segment_index: Some(seg.index),
            load_segment_rwx: seg.permissions.rwx(),
            va_range: Some(va),
            file_range,
            has_paddr: seg.physical_start.is_some(),
            addr_space: if paddr_range.is_some() {
                AddrSpace::VaPa
            } else {
                AddrSpace::Va
            },
            paddr_range,
        }
    }
}
