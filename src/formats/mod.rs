//! Binary format parsers.

pub mod elf;
pub mod sniff;
