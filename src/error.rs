//! Error types for the elfdelta pipeline.
//!
//! Per-file conditions (`NotElf`, `Parse`, `Io`) are isolated by the scanner
//! and reported alongside the records; only `Config` aborts a run.

use std::path::PathBuf;
use thiserror::Error;

use crate::formats::elf::ElfError;
use crate::formats::sniff::OtherFormat;

/// Main error type for elfdelta operations.
#[derive(Debug, Error)]
pub enum ElfDeltaError {
    /// The file does not start with the ELF magic.
    #[error("{}: not an ELF file{}", path.display(), describe_other(other_format))]
    NotElf {
        path: PathBuf,
        other_format: Option<OtherFormat>,
    },

    /// ELF magic is present but the headers are truncated or malformed.
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ElfError,
    },

    /// Rule or group configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The file could not be opened or read.
    #[error("{}: I/O error: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: crate::io::error::IoError,
    },
}

fn describe_other(other: &Option<OtherFormat>) -> String {
    match other {
        Some(fmt) => format!(" (looks like {})", fmt),
        None => String::new(),
    }
}

impl ElfDeltaError {
    /// Only configuration errors stop a run; everything else is per-file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ElfDeltaError::Config(_))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ElfDeltaError::Config(msg.into())
    }
}

impl From<serde_json::Error> for ElfDeltaError {
    fn from(err: serde_json::Error) -> Self {
        ElfDeltaError::Config(err.to_string())
    }
}

/// Result type alias for elfdelta operations
pub type Result<T> = std::result::Result<T, ElfDeltaError>;
