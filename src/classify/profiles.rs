//! Built-in classification profiles.
//!
//! Each profile is an ordinary rule document, so anything a profile does can
//! also be expressed in a user configuration file.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::classify::config::GroupConfig;
use crate::error::ElfDeltaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Read-only data folded into DATA.
    Berkeley,
    /// Read-only data folded into TEXT.
    Gnu,
    /// One group per section name.
    SysV,
    /// Dynamic-linking, note, code, bss and data buckets.
    Custom,
}

const BERKELEY: &str = r#"{"rules": [
    {"if": {"section_type": "META"}, "group": "FILESIZE"},
    {"if": {"is_nobits": true, "section_flags_perms": "*A*"}, "group": "BSS"},
    {"if": {"section_flags_perms": "*AX*"}, "group": "TEXT"},
    {"if": {"section_flags_perms": "*A*"}, "group": "DATA"},
    {"if": {}, "group": "OTHERS"}
]}"#;

const GNU: &str = r#"{"rules": [
    {"if": {"section_type": "META"}, "group": "FILESIZE"},
    {"if": {"is_nobits": true, "section_flags_perms": "*A*"}, "group": "BSS"},
    {"if": {"section_flags_perms": "*AX*"}, "group": "TEXT"},
    {"if": {"section_flags_perms": "WA*"}, "group": "DATA"},
    {"if": {"section_flags_perms": "*A*"}, "group": "TEXT"},
    {"if": {}, "group": "OTHERS"}
]}"#;

const SYSV: &str = "{}";

const CUSTOM: &str = r#"{"rules": [
    {"if": {"section_type": "META"}, "group": "FILESIZE"},
    {"if": {"section_name": "*dyn*"}, "group": "DYNAMIC"},
    {"if": {"section_name": ".note*"}, "group": "EXCLUDE"},
    {"if": {"section_flags_perms": "*AX*"}, "group": "TEXT"},
    {"if": {"is_nobits": true, "section_flags_perms": "*A*"}, "group": "BSS"},
    {"if": {"section_flags_perms": "*A*"}, "group": "DATA"},
    {"if": {}, "group": "OTHERS"}
]}"#;

fn builtin(doc: &str) -> GroupConfig {
    GroupConfig::from_json_str(doc).expect("valid built-in profile")
}

static BERKELEY_CONFIG: Lazy<GroupConfig> = Lazy::new(|| builtin(BERKELEY));
static GNU_CONFIG: Lazy<GroupConfig> = Lazy::new(|| builtin(GNU));
static SYSV_CONFIG: Lazy<GroupConfig> = Lazy::new(|| builtin(SYSV));
static CUSTOM_CONFIG: Lazy<GroupConfig> = Lazy::new(|| builtin(CUSTOM));

impl Profile {
    pub const ALL: [Profile; 4] = [
        Profile::Berkeley,
        Profile::Gnu,
        Profile::SysV,
        Profile::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Berkeley => "berkeley",
            Profile::Gnu => "gnu",
            Profile::SysV => "sysv",
            Profile::Custom => "custom",
        }
    }

    /// The profile's rule document.
    pub fn document(&self) -> &'static str {
        match self {
            Profile::Berkeley => BERKELEY,
            Profile::Gnu => GNU,
            Profile::SysV => SYSV,
            Profile::Custom => CUSTOM,
        }
    }

    pub fn config(&self) -> &'static GroupConfig {
        match self {
            Profile::Berkeley => &BERKELEY_CONFIG,
            Profile::Gnu => &GNU_CONFIG,
            Profile::SysV => &SYSV_CONFIG,
            Profile::Custom => &CUSTOM_CONFIG,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = ElfDeltaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ElfDeltaError::config(format!("unknown profile: {}", s)))
    }
}
