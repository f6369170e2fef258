//! Bounds-checked, endian-aware reads over an ELF image

use crate::formats::elf::types::{ElfClass, ElfData, ElfError, Result};

/// Reader over a borrowed byte buffer.
///
/// Every read takes an explicit offset and fails with `Truncated` instead of
/// panicking when the buffer is too short. Word-sized reads follow the
/// ELF class; all multi-byte reads follow the ELF data encoding.
#[derive(Debug, Clone, Copy)]
pub struct BinaryReader<'data> {
    data: &'data [u8],
    class: ElfClass,
    endian: ElfData,
}

impl<'data> BinaryReader<'data> {
    pub fn new(data: &'data [u8], class: ElfClass, endian: ElfData) -> Self {
        Self {
            data,
            class,
            endian,
        }
    }

    pub fn class(&self) -> ElfClass {
        self.class
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: u64, len: u64) -> Result<&'data [u8]> {
        let (start, end) = checked_range(offset, len, self.data.len())?;
        Ok(&self.data[start..end])
    }

    /// Copy a fixed-length array starting at `offset`.
    pub fn read_array<const N: usize>(&self, offset: u64) -> Result<[u8; N]> {
        let slice = self.bytes(offset, N as u64)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        let bytes = self.read_array::<2>(offset)?;
        Ok(match self.endian {
            ElfData::Little => u16::from_le_bytes(bytes),
            ElfData::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        let bytes = self.read_array::<4>(offset)?;
        Ok(match self.endian {
            ElfData::Little => u32::from_le_bytes(bytes),
            ElfData::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        let bytes = self.read_array::<8>(offset)?;
        Ok(match self.endian {
            ElfData::Little => u64::from_le_bytes(bytes),
            ElfData::Big => u64::from_be_bytes(bytes),
        })
    }

    /// Read an address/offset/size word: 4 bytes for ELF32, 8 for ELF64.
    pub fn read_word(&self, offset: u64) -> Result<u64> {
        match self.class {
            ElfClass::Elf32 => self.read_u32(offset).map(u64::from),
            ElfClass::Elf64 => self.read_u64(offset),
        }
    }

    /// Width of `read_word` in bytes.
    pub fn word_size(&self) -> u64 {
        match self.class {
            ElfClass::Elf32 => 4,
            ElfClass::Elf64 => 8,
        }
    }
}

/// Validate `[offset, offset + len)` against a buffer length.
pub fn checked_range(offset: u64, len: u64, data_len: usize) -> Result<(usize, usize)> {
    let end = offset
        .checked_add(len)
        .ok_or(ElfError::InvalidOffset { offset })?;
    if end > data_len as u64 {
        return Err(ElfError::Truncated {
            offset,
            needed: len,
        });
    }
    Ok((offset as usize, end as usize))
}

/// Read a NUL-terminated name from a string table; invalid UTF-8 is replaced.
pub fn read_cstring(data: &[u8], offset: usize) -> Option<String> {
    if offset >= data.len() {
        return None;
    }

    let slice = &data[offset..];
    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());

    Some(String::from_utf8_lossy(&slice[..end]).into_owned())
}
