//! Core ELF types and constants

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// ELF parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElfError {
    #[error("Invalid ELF magic")]
    InvalidMagic,
    #[error("Unsupported ELF class: {0}")]
    UnsupportedClass(u8),
    #[error("Unsupported ELF data encoding: {0}")]
    UnsupportedData(u8),
    #[error("Invalid offset: {offset:#x}")]
    InvalidOffset { offset: u64 },
    #[error("Truncated at {offset:#x}, needed {needed} bytes")]
    Truncated { offset: u64, needed: u64 },
    #[error("Malformed header: {0}")]
    MalformedHeader(String),
}

pub type Result<T> = std::result::Result<T, ElfError>;

/// ELF magic number
pub const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Size of `e_ident`
pub const EI_NIDENT: usize = 16;

/// ELF class (32-bit or 64-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElfClass {
    Elf32 = 1,
    Elf64 = 2,
}

impl ElfClass {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfClass::Elf32),
            2 => Ok(ElfClass::Elf64),
            _ => Err(ElfError::UnsupportedClass(val)),
        }
    }

    /// Expected `e_ehsize`
    pub fn header_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 52,
            ElfClass::Elf64 => 64,
        }
    }

    /// Expected `e_shentsize`
    pub fn section_header_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 40,
            ElfClass::Elf64 => 64,
        }
    }

    /// Expected `e_phentsize`
    pub fn program_header_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 56,
        }
    }
}

/// ELF data encoding (endianness)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElfData {
    Little = 1,
    Big = 2,
}

impl ElfData {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfData::Little),
            2 => Ok(ElfData::Big),
            _ => Err(ElfError::UnsupportedData(val)),
        }
    }
}

/// ELF identification (first 16 bytes)
#[derive(Debug, Clone, Copy)]
pub struct ElfIdent {
    pub class: ElfClass,
    pub data: ElfData,
    pub version: u8,
    pub osabi: u8,
}

/// ELF header, reduced to the fields that locate the header tables.
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    pub ident: ElfIdent,
    pub e_type: u16,
    pub e_machine: u16,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

/// Special section index: real string table index lives in section 0's `sh_link`
pub const SHN_XINDEX: u16 = 0xffff;
/// Special program header count: real count lives in section 0's `sh_info`
pub const PN_XNUM: u16 = 0xffff;

/// Section header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

/// Section types
pub const SHT_NULL: u32 = 0;
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_HASH: u32 = 5;
pub const SHT_DYNAMIC: u32 = 6;
pub const SHT_NOTE: u32 = 7;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;
pub const SHT_SHLIB: u32 = 10;
pub const SHT_DYNSYM: u32 = 11;
pub const SHT_INIT_ARRAY: u32 = 14;
pub const SHT_FINI_ARRAY: u32 = 15;
pub const SHT_PREINIT_ARRAY: u32 = 16;
pub const SHT_GROUP: u32 = 17;
pub const SHT_SYMTAB_SHNDX: u32 = 18;
pub const SHT_GNU_HASH: u32 = 0x6ffffff6;
pub const SHT_GNU_VERDEF: u32 = 0x6ffffffd;
pub const SHT_GNU_VERNEED: u32 = 0x6ffffffe;
pub const SHT_GNU_VERSYM: u32 = 0x6fffffff;

bitflags! {
    /// Section flags (`sh_flags`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SectionFlags: u64 {
        const WRITE = 0x1;
        const ALLOC = 0x2;
        const EXECINSTR = 0x4;
        const MERGE = 0x10;
        const STRINGS = 0x20;
        const INFO_LINK = 0x40;
        const LINK_ORDER = 0x80;
        const OS_NONCONFORMING = 0x100;
        const GROUP = 0x200;
        const TLS = 0x400;
        const COMPRESSED = 0x800;
        const EXCLUDE = 0x8000_0000;

        const _ = !0;
    }
}

impl SectionFlags {
    /// Permission-letter summary, e.g. `WA`, `AX`, `MS`.
    pub fn summary(&self) -> String {
        const LETTERS: [(SectionFlags, char); 9] = [
            (SectionFlags::WRITE, 'W'),
            (SectionFlags::ALLOC, 'A'),
            (SectionFlags::EXECINSTR, 'X'),
            (SectionFlags::TLS, 'T'),
            (SectionFlags::MERGE, 'M'),
            (SectionFlags::STRINGS, 'S'),
            (SectionFlags::GROUP, 'G'),
            (SectionFlags::COMPRESSED, 'C'),
            (SectionFlags::EXCLUDE, 'E'),
        ];
        LETTERS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, c)| *c)
            .collect()
    }
}

/// Program header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

/// Loadable segment; the only program header type the mapper uses
pub const PT_LOAD: u32 = 1;

bitflags! {
    /// Segment permission flags (`p_flags`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u32 {
        const X = 0x1;
        const W = 0x2;
        const R = 0x4;

        const _ = !0;
    }
}

impl SegmentFlags {
    /// `R`, `W`, `X` letters in that order, e.g. `RX`.
    pub fn rwx(&self) -> String {
        let mut out = String::with_capacity(3);
        if self.contains(SegmentFlags::R) {
            out.push('R');
        }
        if self.contains(SegmentFlags::W) {
            out.push('W');
        }
        if self.contains(SegmentFlags::X) {
            out.push('X');
        }
        out
    }
}

/// Normalized section type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SectionKind {
    Null,
    Progbits,
    Symtab,
    Strtab,
    Rela,
    Hash,
    Dynamic,
    Note,
    Nobits,
    Rel,
    Shlib,
    Dynsym,
    InitArray,
    FiniArray,
    PreinitArray,
    Group,
    SymtabShndx,
    GnuHash,
    GnuVerdef,
    GnuVerneed,
    GnuVersym,
    /// Synthetic per-file record, not a real section
    Meta,
    Other(u32),
}

impl SectionKind {
    pub fn from_raw(sh_type: u32) -> Self {
        match sh_type {
            SHT_NULL => SectionKind::Null,
            SHT_PROGBITS => SectionKind::Progbits,
            SHT_SYMTAB => SectionKind::Symtab,
            SHT_STRTAB => SectionKind::Strtab,
            SHT_RELA => SectionKind::Rela,
            SHT_HASH => SectionKind::Hash,
            SHT_DYNAMIC => SectionKind::Dynamic,
            SHT_NOTE => SectionKind::Note,
            SHT_NOBITS => SectionKind::Nobits,
            SHT_REL => SectionKind::Rel,
            SHT_SHLIB => SectionKind::Shlib,
            SHT_DYNSYM => SectionKind::Dynsym,
            SHT_INIT_ARRAY => SectionKind::InitArray,
            SHT_FINI_ARRAY => SectionKind::FiniArray,
            SHT_PREINIT_ARRAY => SectionKind::PreinitArray,
            SHT_GROUP => SectionKind::Group,
            SHT_SYMTAB_SHNDX => SectionKind::SymtabShndx,
            SHT_GNU_HASH => SectionKind::GnuHash,
            SHT_GNU_VERDEF => SectionKind::GnuVerdef,
            SHT_GNU_VERNEED => SectionKind::GnuVerneed,
            SHT_GNU_VERSYM => SectionKind::GnuVersym,
            other => SectionKind::Other(other),
        }
    }

    pub fn name(&self) -> String {
        let s = match self {
            SectionKind::Null => "NULL",
            SectionKind::Progbits => "PROGBITS",
            SectionKind::Symtab => "SYMTAB",
            SectionKind::Strtab => "STRTAB",
            SectionKind::Rela => "RELA",
            SectionKind::Hash => "HASH",
            SectionKind::Dynamic => "DYNAMIC",
            SectionKind::Note => "NOTE",
            SectionKind::Nobits => "NOBITS",
            SectionKind::Rel => "REL",
            SectionKind::Shlib => "SHLIB",
            SectionKind::Dynsym => "DYNSYM",
            SectionKind::InitArray => "INIT_ARRAY",
            SectionKind::FiniArray => "FINI_ARRAY",
            SectionKind::PreinitArray => "PREINIT_ARRAY",
            SectionKind::Group => "GROUP",
            SectionKind::SymtabShndx => "SYMTAB_SHNDX",
            SectionKind::GnuHash => "GNU_HASH",
            SectionKind::GnuVerdef => "GNU_VERDEF",
            SectionKind::GnuVerneed => "GNU_VERNEED",
            SectionKind::GnuVersym => "GNU_VERSYM",
            SectionKind::Meta => "META",
            SectionKind::Other(raw) => return format!("TYPE_{:#x}", raw),
        };
        s.to_string()
    }
}

impl From<SectionKind> for String {
    fn from(kind: SectionKind) -> Self {
        kind.name()
    }
}

impl TryFrom<String> for SectionKind {
    type Error = String;

    fn try_from(name: String) -> std::result::Result<Self, Self::Error> {
        const NAMED: [u32; 21] = [
            SHT_NULL,
            SHT_PROGBITS,
            SHT_SYMTAB,
            SHT_STRTAB,
            SHT_RELA,
            SHT_HASH,
            SHT_DYNAMIC,
            SHT_NOTE,
            SHT_NOBITS,
            SHT_REL,
            SHT_SHLIB,
            SHT_DYNSYM,
            SHT_INIT_ARRAY,
            SHT_FINI_ARRAY,
            SHT_PREINIT_ARRAY,
            SHT_GROUP,
            SHT_SYMTAB_SHNDX,
            SHT_GNU_HASH,
            SHT_GNU_VERDEF,
            SHT_GNU_VERNEED,
            SHT_GNU_VERSYM,
        ];
        if name == "META" {
            return Ok(SectionKind::Meta);
        }
        if let Some(hex) = name.strip_prefix("TYPE_0x") {
            return u32::from_str_radix(hex, 16)
                .map(SectionKind::from_raw)
                .map_err(|_| format!("invalid section type: {}", name));
        }
        NAMED
            .iter()
            .map(|&raw| SectionKind::from_raw(raw))
            .find(|kind| kind.name() == name)
            .ok_or_else(|| format!("unknown section type: {}", name))
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Section with its resolved name
#[derive(Debug, Clone)]
pub struct Section {
    pub index: usize,
    pub header: SectionHeader,
    pub name: String,
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        SectionKind::from_raw(self.header.sh_type)
    }

    pub fn flags(&self) -> SectionFlags {
        SectionFlags::from_bits_retain(self.header.sh_flags)
    }

    pub fn is_nobits(&self) -> bool {
        self.header.sh_type == SHT_NOBITS
    }
}

/// Program segment with its position in the program header table
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub index: usize,
    pub header: ProgramHeader,
}

impl Segment {
    pub fn is_load(&self) -> bool {
        self.header.p_type == PT_LOAD
    }

    pub fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(self.header.p_flags)
    }
}
