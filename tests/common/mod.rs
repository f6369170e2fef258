//! Shared helpers: an in-memory ELF image builder and scan-tree fixtures.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOTE: u32 = 7;
pub const SHT_NOBITS: u32 = 8;
pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;

pub const SHF_WRITE: u64 = 0x1;
pub const SHF_ALLOC: u64 = 0x2;
pub const SHF_EXECINSTR: u64 = 0x4;
pub const SHF_MERGE: u64 = 0x10;
pub const SHF_STRINGS: u64 = 0x20;

pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const PF_R: u32 = 0x4;

#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub addr: u64,
    pub size: u64,
    /// Placed after the previous section when `None`
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentSpec {
    pub p_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

/// Builds ELF32/ELF64 images in either byte order.
///
/// Section 0 (null) and a trailing `.shstrtab` are added automatically.
#[derive(Debug, Clone)]
pub struct ElfBuilder {
    is_64: bool,
    little: bool,
    extended_numbering: bool,
    sections: Vec<SectionSpec>,
    segments: Vec<SegmentSpec>,
}

impl ElfBuilder {
    pub fn new64() -> Self {
        Self {
            is_64: true,
            little: true,
            extended_numbering: false,
            sections: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn new32() -> Self {
        Self {
            is_64: false,
            ..Self::new64()
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.little = false;
        self
    }

    /// Store the section count and string table index in section 0.
    pub fn extended_numbering(mut self) -> Self {
        self.extended_numbering = true;
        self
    }

    pub fn section(mut self, name: &str, sh_type: u32, flags: u64, addr: u64, size: u64) -> Self {
        self.sections.push(SectionSpec {
            name: name.to_string(),
            sh_type,
            flags,
            addr,
            size,
            offset: None,
        });
        self
    }

    pub fn section_at(
        mut self,
        name: &str,
        sh_type: u32,
        flags: u64,
        addr: u64,
        offset: u64,
        size: u64,
    ) -> Self {
        self.sections.push(SectionSpec {
            name: name.to_string(),
            sh_type,
            flags,
            addr,
            size,
            offset: Some(offset),
        });
        self
    }

    pub fn segment(mut self, spec: SegmentSpec) -> Self {
        self.segments.push(spec);
        self
    }

    pub fn load(self, flags: u32, offset: u64, vaddr: u64, filesz: u64, memsz: u64) -> Self {
        self.segment(SegmentSpec {
            p_type: PT_LOAD,
            flags,
            offset,
            vaddr,
            paddr: 0,
            filesz,
            memsz,
        })
    }

    fn put(&self, buf: &mut Vec<u8>, off: usize, bytes: &[u8]) {
        if buf.len() < off + bytes.len() {
            buf.resize(off + bytes.len(), 0);
        }
        buf[off..off + bytes.len()].copy_from_slice(bytes);
    }

    fn u16(&self, buf: &mut Vec<u8>, off: usize, v: u16) {
        let b = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.put(buf, off, &b);
    }

    fn u32(&self, buf: &mut Vec<u8>, off: usize, v: u32) {
        let b = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.put(buf, off, &b);
    }

    fn u64(&self, buf: &mut Vec<u8>, off: usize, v: u64) {
        let b = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.put(buf, off, &b);
    }

    /// Class-sized word.
    fn word(&self, buf: &mut Vec<u8>, off: usize, v: u64) {
        if self.is_64 {
            self.u64(buf, off, v);
        } else {
            self.u32(buf, off, v as u32);
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let (ehsize, phentsize, shentsize) = if self.is_64 { (64, 56, 64) } else { (52, 32, 40) };
        let word = if self.is_64 { 8 } else { 4 };

        let mut buf = vec![0u8; ehsize];
        let phoff = if self.segments.is_empty() { 0 } else { ehsize };
        let mut cursor = (ehsize + self.segments.len() * phentsize) as u64;

        // section contents
        let mut offsets = Vec::with_capacity(self.sections.len());
        for s in &self.sections {
            let off = s.offset.unwrap_or(cursor);
            offsets.push(off);
            if s.sh_type != SHT_NOBITS {
                let end = (off + s.size) as usize;
                if buf.len() < end {
                    buf.resize(end, 0);
                }
                for b in &mut buf[off as usize..end] {
                    *b = 0xcc;
                }
                cursor = cursor.max(off + s.size);
            } else {
                cursor = cursor.max(off);
            }
        }
        cursor = cursor.max(buf.len() as u64);

        // .shstrtab
        let mut strtab = vec![0u8];
        let mut name_offsets = Vec::with_capacity(self.sections.len() + 1);
        for name in self
            .sections
            .iter()
            .map(|s| s.name.as_str())
            .chain(std::iter::once(".shstrtab"))
        {
            name_offsets.push(strtab.len() as u32);
            strtab.extend_from_slice(name.as_bytes());
            strtab.push(0);
        }
        let strtab_off = cursor;
        self.put(&mut buf, strtab_off as usize, &strtab);

        let shoff = (buf.len() as u64 + 7) & !7;
        let shnum = self.sections.len() + 2;
        let shstrndx = shnum - 1;

        // ELF header
        buf[0..4].copy_from_slice(b"\x7fELF");
        buf[4] = if self.is_64 { 2 } else { 1 };
        buf[5] = if self.little { 1 } else { 2 };
        buf[6] = 1;
        self.u16(&mut buf, 16, 3); // ET_DYN
        self.u16(&mut buf, 18, if self.is_64 { 62 } else { 3 });
        self.u32(&mut buf, 20, 1);
        self.word(&mut buf, 24 + word, phoff as u64);
        self.word(&mut buf, 24 + 2 * word, shoff);
        let tail = 24 + 3 * word + 4;
        self.u16(&mut buf, tail, ehsize as u16);
        self.u16(&mut buf, tail + 2, phentsize as u16);
        self.u16(&mut buf, tail + 4, self.segments.len() as u16);
        self.u16(&mut buf, tail + 6, shentsize as u16);
        if self.extended_numbering {
            self.u16(&mut buf, tail + 8, 0);
            self.u16(&mut buf, tail + 10, 0xffff);
        } else {
            self.u16(&mut buf, tail + 8, shnum as u16);
            self.u16(&mut buf, tail + 10, shstrndx as u16);
        }

        // program headers
        for (i, p) in self.segments.iter().enumerate() {
            let base = phoff + i * phentsize;
            if self.is_64 {
                self.u32(&mut buf, base, p.p_type);
                self.u32(&mut buf, base + 4, p.flags);
                self.u64(&mut buf, base + 8, p.offset);
                self.u64(&mut buf, base + 16, p.vaddr);
                self.u64(&mut buf, base + 24, p.paddr);
                self.u64(&mut buf, base + 32, p.filesz);
                self.u64(&mut buf, base + 40, p.memsz);
                self.u64(&mut buf, base + 48, 0x1000);
            } else {
                self.u32(&mut buf, base, p.p_type);
                self.u32(&mut buf, base + 4, p.offset as u32);
                self.u32(&mut buf, base + 8, p.vaddr as u32);
                self.u32(&mut buf, base + 12, p.paddr as u32);
                self.u32(&mut buf, base + 16, p.filesz as u32);
                self.u32(&mut buf, base + 20, p.memsz as u32);
                self.u32(&mut buf, base + 24, p.flags);
                self.u32(&mut buf, base + 28, 0x1000);
            }
        }

        // section headers: null, user sections, .shstrtab
        let mut headers = Vec::with_capacity(shnum);
        let (null_size, null_link) = if self.extended_numbering {
            (shnum as u64, shstrndx as u32)
        } else {
            (0, 0)
        };
        headers.push((0u32, 0u32, 0u64, 0u64, 0u64, null_size, null_link));
        for (i, s) in self.sections.iter().enumerate() {
            headers.push((
                name_offsets[i],
                s.sh_type,
                s.flags,
                s.addr,
                offsets[i],
                s.size,
                0,
            ));
        }
        headers.push((
            name_offsets[self.sections.len()],
            SHT_STRTAB,
            0,
            0,
            strtab_off,
            strtab.len() as u64,
            0,
        ));

        for (i, (name, sh_type, flags, addr, offset, size, link)) in headers.into_iter().enumerate() {
            let base = shoff as usize + i * shentsize;
            self.u32(&mut buf, base, name);
            self.u32(&mut buf, base + 4, sh_type);
            if self.is_64 {
                self.u64(&mut buf, base + 8, flags);
                self.u64(&mut buf, base + 16, addr);
                self.u64(&mut buf, base + 24, offset);
                self.u64(&mut buf, base + 32, size);
                self.u32(&mut buf, base + 40, link);
                self.u32(&mut buf, base + 44, 0);
                self.u64(&mut buf, base + 48, 1);
                self.u64(&mut buf, base + 56, 0);
            } else {
                self.u32(&mut buf, base + 8, flags as u32);
                self.u32(&mut buf, base + 12, addr as u32);
                self.u32(&mut buf, base + 16, offset as u32);
                self.u32(&mut buf, base + 20, size as u32);
                self.u32(&mut buf, base + 24, link);
                self.u32(&mut buf, base + 28, 0);
                self.u32(&mut buf, base + 32, 1);
                self.u32(&mut buf, base + 36, 0);
            }
        }
        buf
    }
}

/// A small executable: R, RX and RW loads with text, rodata, data, bss and
/// a non-alloc comment section. `text_size` lets snapshots differ.
pub fn sample_exec(builder: ElfBuilder, text_size: u64) -> Vec<u8> {
    builder
        .load(PF_R, 0, 0x400000, 0x1000, 0x1000)
        .load(PF_R | PF_X, 0x1000, 0x401000, 0x1000, 0x1000)
        .load(PF_R | PF_W, 0x2000, 0x402000, 0x100, 0x200)
        .section_at(
            ".text",
            SHT_PROGBITS,
            SHF_ALLOC | SHF_EXECINSTR,
            0x401000,
            0x1000,
            text_size,
        )
        .section_at(".rodata", SHT_PROGBITS, SHF_ALLOC, 0x400800, 0x800, 0x100)
        .section_at(
            ".data",
            SHT_PROGBITS,
            SHF_WRITE | SHF_ALLOC,
            0x402000,
            0x2000,
            0x100,
        )
        .section_at(
            ".bss",
            SHT_NOBITS,
            SHF_WRITE | SHF_ALLOC,
            0x402100,
            0x2100,
            0x100,
        )
        .section_at(
            ".comment",
            SHT_PROGBITS,
            SHF_MERGE | SHF_STRINGS,
            0,
            0x2100,
            0x20,
        )
        .build()
}

/// A shared object with a dynamic symbol table and a note.
pub fn sample_shared(text_size: u64) -> Vec<u8> {
    ElfBuilder::new64()
        .load(PF_R | PF_X, 0, 0, 0x3000, 0x3000)
        .load(PF_R | PF_W, 0x3000, 0x4000, 0x200, 0x400)
        .section_at(".note.gnu.build-id", SHT_NOTE, SHF_ALLOC, 0x200, 0x200, 0x24)
        .section_at(".dynsym", 11, SHF_ALLOC, 0x300, 0x300, 0x90)
        .section_at(
            ".text",
            SHT_PROGBITS,
            SHF_ALLOC | SHF_EXECINSTR,
            0x1000,
            0x1000,
            text_size,
        )
        .section_at(
            ".data",
            SHT_PROGBITS,
            SHF_WRITE | SHF_ALLOC,
            0x4000,
            0x3000,
            0x200,
        )
        .section_at(
            ".bss",
            SHT_NOBITS,
            SHF_WRITE | SHF_ALLOC,
            0x4200,
            0x3200,
            0x200,
        )
        .build()
}

/// First bytes of a 64-bit little-endian Mach-O.
pub fn macho_bytes() -> Vec<u8> {
    let mut data = vec![0xcf, 0xfa, 0xed, 0xfe];
    data.extend_from_slice(&[0u8; 28]);
    data
}

/// Write `bytes` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}
