//! Program header table

use crate::formats::elf::types::*;
use crate::formats::elf::utils::BinaryReader;

/// Program headers in table order.
///
/// The order is never changed: the position of a header in this table is
/// the segment index reported for every section mapped into it.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    /// Parse the program header table.
    ///
    /// `extended_phnum` is section 0's `sh_info`, consulted only when
    /// `e_phnum == PN_XNUM`.
    pub fn parse(data: &[u8], header: &ElfHeader, extended_phnum: Option<u64>) -> Result<Self> {
        let count = if header.e_phnum == PN_XNUM {
            extended_phnum.ok_or_else(|| {
                ElfError::MalformedHeader(
                    "e_phnum is PN_XNUM but there is no section 0".to_string(),
                )
            })?
        } else {
            header.e_phnum as u64
        };

        if count == 0 || header.e_phoff == 0 {
            return Ok(Self::default());
        }

        let r = BinaryReader::new(data, header.ident.class, header.ident.data);
        let entsize = header.e_phentsize as u64;
        let table_size = count
            .checked_mul(entsize)
            .ok_or(ElfError::InvalidOffset {
                offset: header.e_phoff,
            })?;
        r.bytes(header.e_phoff, table_size)?;

        let mut segments = Vec::with_capacity(count as usize);
        for index in 0..count {
            let ph = parse_program_header(&r, header.e_phoff + index * entsize)?;
            segments.push(Segment {
                index: index as usize,
                header: ph,
            });
        }

        Ok(Self { segments })
    }

    /// PT_LOAD entries, in table order
    pub fn load_segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter().filter(|s| s.is_load())
    }

    /// All segments
    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter()
    }
}

/// Parse a single program header
fn parse_program_header(r: &BinaryReader<'_>, offset: u64) -> Result<ProgramHeader> {
    match r.class() {
        ElfClass::Elf32 => {
            r.bytes(offset, 32)?;
            Ok(ProgramHeader {
                p_type: r.read_u32(offset)?,
                p_offset: r.read_u32(offset + 4)? as u64,
                p_vaddr: r.read_u32(offset + 8)? as u64,
                p_paddr: r.read_u32(offset + 12)? as u64,
                p_filesz: r.read_u32(offset + 16)? as u64,
                p_memsz: r.read_u32(offset + 20)? as u64,
                p_flags: r.read_u32(offset + 24)?,
                p_align: r.read_u32(offset + 28)? as u64,
            })
        }
        ElfClass::Elf64 => {
            r.bytes(offset, 56)?;
            Ok(ProgramHeader {
                p_type: r.read_u32(offset)?,
                p_flags: r.read_u32(offset + 4)?,
                p_offset: r.read_u64(offset + 8)?,
                p_vaddr: r.read_u64(offset + 16)?,
                p_paddr: r.read_u64(offset + 24)?,
                p_filesz: r.read_u64(offset + 32)?,
                p_memsz: r.read_u64(offset + 40)?,
                p_align: r.read_u64(offset + 48)?,
            })
        }
    }
}
