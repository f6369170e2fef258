//! Section header table

use crate::formats::elf::types::*;
use crate::formats::elf::utils::{read_cstring, BinaryReader};

/// Decoded section header table with resolved names, in table order.
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    sections: Vec<Section>,
    /// Section 0's header, which carries the extended-numbering fields
    initial: Option<SectionHeader>,
}

impl SectionTable {
    /// Parse section table from ELF data
    pub fn parse(data: &[u8], header: &ElfHeader) -> Result<Self> {
        if header.e_shoff == 0 {
            return Ok(Self::default());
        }

        let r = BinaryReader::new(data, header.ident.class, header.ident.data);
        let entsize = header.e_shentsize as u64;

        // Extended numbering: the real count lives in section 0's sh_size
        let initial = parse_section_header(&r, header.e_shoff)?;
        let count = if header.e_shnum == 0 {
            initial.sh_size
        } else {
            header.e_shnum as u64
        };

        let table_size = count
            .checked_mul(entsize)
            .ok_or(ElfError::InvalidOffset {
                offset: header.e_shoff,
            })?;
        r.bytes(header.e_shoff, table_size)?;

        let mut headers = Vec::with_capacity(count as usize);
        for i in 0..count {
            headers.push(parse_section_header(&r, header.e_shoff + i * entsize)?);
        }

        let shstrndx = if header.e_shstrndx == SHN_XINDEX {
            initial.sh_link as usize
        } else {
            header.e_shstrndx as usize
        };

        // A bad string table leaves names empty; it does not fail the file
        let strings: &[u8] = headers
            .get(shstrndx)
            .filter(|sh| sh.sh_type != SHT_NOBITS)
            .and_then(|sh| r.bytes(sh.sh_offset, sh.sh_size).ok())
            .unwrap_or(&[]);

        let sections: Vec<Section> = headers
            .into_iter()
            .enumerate()
            .map(|(index, sh)| Section {
                index,
                name: read_cstring(strings, sh.sh_name as usize).unwrap_or_default(),
                header: sh,
            })
            .collect();

        Ok(Self {
            sections,
            initial: Some(initial),
        })
    }

    /// All sections in table order
    pub fn sections(&self) -> impl Iterator<Item = &Section> + '_ {
        self.sections.iter()
    }

    /// Count sections
    pub fn count(&self) -> usize {
        self.sections.len()
    }

    /// Program header count stored in section 0 when `e_phnum == PN_XNUM`
    pub fn extended_phnum(&self) -> Option<u64> {
        self.initial.map(|sh| sh.sh_info as u64)
    }
}

/// Parse a single section header
fn parse_section_header(r: &BinaryReader<'_>, offset: u64) -> Result<SectionHeader> {
    match r.class() {
        ElfClass::Elf32 => {
            r.bytes(offset, 40)?;
            Ok(SectionHeader {
                sh_name: r.read_u32(offset)?,
                sh_type: r.read_u32(offset + 4)?,
                sh_flags: r.read_u32(offset + 8)? as u64,
                sh_addr: r.read_u32(offset + 12)? as u64,
                sh_offset: r.read_u32(offset + 16)? as u64,
                sh_size: r.read_u32(offset + 20)? as u64,
                sh_link: r.read_u32(offset + 24)?,
                sh_info: r.read_u32(offset + 28)?,
                sh_addralign: r.read_u32(offset + 32)? as u64,
                sh_entsize: r.read_u32(offset + 36)? as u64,
            })
        }
        ElfClass::Elf64 => {
            r.bytes(offset, 64)?;
            Ok(SectionHeader {
                sh_name: r.read_u32(offset)?,
                sh_type: r.read_u32(offset + 4)?,
                sh_flags: r.read_u64(offset + 8)?,
                sh_addr: r.read_u64(offset + 16)?,
                sh_offset: r.read_u64(offset + 24)?,
                sh_size: r.read_u64(offset + 32)?,
                sh_link: r.read_u32(offset + 40)?,
                sh_info: r.read_u32(offset + 44)?,
                sh_addralign: r.read_u64(offset + 48)?,
                sh_entsize: r.read_u64(offset + 56)?,
            })
        }
    }
}
