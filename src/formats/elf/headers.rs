//! ELF header parsing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::BinaryReader;

/// Parse ELF identification bytes
pub fn parse_ident(data: &[u8]) -> Result<ElfIdent> {
    if data.len() < 4 || &data[0..4] != ELF_MAGIC {
        return Err(ElfError::InvalidMagic);
    }

    if data.len() < EI_NIDENT {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: EI_NIDENT as u64,
        });
    }

    let class = ElfClass::from_u8(data[4])?;
    let data_encoding = ElfData::from_u8(data[5])?;

    Ok(ElfIdent {
        class,
        data: data_encoding,
        version: data[6],
        osabi: data[7],
    })
}

/// Parse ELF header
pub fn parse_header(data: &[u8]) -> Result<ElfHeader> {
    let ident = parse_ident(data)?;

    let header_size = ident.class.header_size();
    if data.len() < header_size {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: header_size as u64,
        });
    }

    let r = BinaryReader::new(data, ident.class, ident.data);

    let e_type = r.read_u16(16)?;
    let e_machine = r.read_u16(18)?;

    // e_entry, e_phoff and e_shoff are words; everything after shifts with the class
    let word = r.word_size();
    let e_phoff = r.read_word(24 + word)?;
    let e_shoff = r.read_word(24 + 2 * word)?;
    let tail = 24 + 3 * word + 4; // skip e_flags
    let e_ehsize = r.read_u16(tail)?;
    let e_phentsize = r.read_u16(tail + 2)?;
    let e_phnum = r.read_u16(tail + 4)?;
    let e_shentsize = r.read_u16(tail + 6)?;
    let e_shnum = r.read_u16(tail + 8)?;
    let e_shstrndx = r.read_u16(tail + 10)?;

    if e_ehsize as usize != header_size {
        return Err(ElfError::MalformedHeader(format!(
            "Invalid e_ehsize: expected {}, got {}",
            header_size, e_ehsize
        )));
    }

    let expected_phentsize = ident.class.program_header_size();
    if e_phnum > 0 && e_phentsize as usize != expected_phentsize {
        return Err(ElfError::MalformedHeader(format!(
            "Invalid e_phentsize: expected {}, got {}",
            expected_phentsize, e_phentsize
        )));
    }

    // e_shnum may be 0 with extended numbering, so check whenever a table exists
    let expected_shentsize = ident.class.section_header_size();
    if (e_shnum > 0 || e_shoff != 0) && e_shentsize as usize != expected_shentsize {
        return Err(ElfError::MalformedHeader(format!(
            "Invalid e_shentsize: expected {}, got {}",
            expected_shentsize, e_shentsize
        )));
    }

    Ok(ElfHeader {
        ident,
        e_type,
        e_machine,
        e_phoff,
        e_shoff,
        e_ehsize,
        e_phentsize,
        e_phnum,
        e_shentsize,
        e_shnum,
        e_shstrndx,
    })
}
