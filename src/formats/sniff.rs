//! Magic-number sniffing.
//!
//! ELF is the only format that is parsed; Mach-O is recognised purely so a
//! scan that finds no ELF files can say why.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::formats::elf::ELF_MAGIC;

const MH_MAGIC: u32 = 0xfeedface;
const MH_CIGAM: u32 = 0xcefaedfe; // swapped
const MH_MAGIC_64: u32 = 0xfeedfacf;
const MH_CIGAM_64: u32 = 0xcffaedfe; // swapped

/// Non-ELF binary formats worth a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtherFormat {
    MachO32,
    MachO64,
}

impl fmt::Display for OtherFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtherFormat::MachO32 => write!(f, "Mach-O 32-bit"),
            OtherFormat::MachO64 => write!(f, "Mach-O 64-bit"),
        }
    }
}

/// Result of looking at the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    Elf,
    Other(OtherFormat),
    Unknown,
}

/// Classify a byte prefix by its magic number.
pub fn sniff_bytes(data: &[u8]) -> Magic {
    if data.len() < 4 {
        return Magic::Unknown;
    }
    if &data[0..4] == ELF_MAGIC {
        return Magic::Elf;
    }
    match u32::from_be_bytes([data[0], data[1], data[2], data[3]]) {
        MH_MAGIC | MH_CIGAM => Magic::Other(OtherFormat::MachO32),
        MH_MAGIC_64 | MH_CIGAM_64 => Magic::Other(OtherFormat::MachO64),
        _ => Magic::Unknown,
    }
}

/// Read up to four bytes from `path` and classify them.
pub fn sniff_path(path: &Path) -> io::Result<Magic> {
    let mut prefix = [0u8; 4];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < prefix.len() {
        let n = file.read(&mut prefix[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(sniff_bytes(&prefix[..filled]))
}
