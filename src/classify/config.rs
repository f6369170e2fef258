//! Group and rule configuration.
//!
//! ```json
//! {
//!   "groups": { "TEXT": [".text*", ".init"], "DATA": [".data*"] },
//!   "rules": [
//!     { "if": { "is_nobits": true, "section_flags_perms": "*A*" }, "group": "BSS" },
//!     { "if": { "section_flags_perms": ["RX*", "*X*"] }, "group": "CODE" }
//!   ]
//! }
//! ```
//!
//! Both keys are optional and keep their document order. String predicates
//! take one pattern or a list; boolean predicates are compared exactly.

use indexmap::IndexMap;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;

use crate::classify::wildcard::PatternSet;
use crate::error::{ElfDeltaError, Result};
use crate::scan::record::SectionRecord;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConditions {
    section_name: Option<OneOrMany>,
    section_type: Option<OneOrMany>,
    section_flags_perms: Option<OneOrMany>,
    load_segment_rwx: Option<OneOrMany>,
    addr_space: Option<OneOrMany>,
    is_nobits: Option<bool>,
    in_load_segment: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(rename = "if", default)]
    conditions: Option<RawConditions>,
    group: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGroupConfig {
    #[serde(default)]
    groups: IndexMap<String, OneOrMany>,
    #[serde(default)]
    rules: Vec<RawRule>,
}

/// Record fields that string predicates can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    SectionName,
    /// Normalized name, e.g. `PROGBITS`
    SectionType,
    SectionFlagsPerms,
    LoadSegmentRwx,
    AddrSpace,
}

impl TextField {
    pub fn value<'a>(&self, record: &'a SectionRecord) -> Cow<'a, str> {
        match self {
            TextField::SectionName => Cow::Borrowed(&record.section_name),
            TextField::SectionType => Cow::Owned(record.type_name()),
            TextField::SectionFlagsPerms => Cow::Borrowed(&record.flags_summary),
            TextField::LoadSegmentRwx => Cow::Borrowed(&record.load_segment_rwx),
            TextField::AddrSpace => Cow::Borrowed(record.addr_space.as_str()),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            TextField::SectionName => "section_name",
            TextField::SectionType => "section_type",
            TextField::SectionFlagsPerms => "section_flags_perms",
            TextField::LoadSegmentRwx => "load_segment_rwx",
            TextField::AddrSpace => "addr_space",
        }
    }
}

/// Record fields that boolean predicates can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolField {
    IsNobits,
    InLoadSegment,
}

impl BoolField {
    pub fn value(&self, record: &SectionRecord) -> bool {
        match self {
            BoolField::IsNobits => record.is_nobits,
            BoolField::InLoadSegment => record.in_load_segment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Text { field: TextField, patterns: PatternSet },
    Bool { field: BoolField, expected: bool },
}

impl Predicate {
    pub fn matches(&self, record: &SectionRecord) -> bool {
        match self {
            Predicate::Text { field, patterns } => patterns.matches(&field.value(record)),
            Predicate::Bool { field, expected } => field.value(record) == *expected,
        }
    }
}

/// A conjunction of predicates and the group it assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub predicates: Vec<Predicate>,
    pub group: String,
}

impl Rule {
    /// An empty conjunction matches everything.
    pub fn matches(&self, record: &SectionRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// Validated classifier configuration. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupConfig {
    groups: IndexMap<String, PatternSet>,
    rules: Vec<Rule>,
}

fn compile(patterns: Vec<String>, context: &str) -> Result<PatternSet> {
    PatternSet::compile(&patterns)
        .map_err(|e| ElfDeltaError::config(format!("{}: invalid pattern: {}", context, e)))
}

impl GroupConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawGroupConfig = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ElfDeltaError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    fn from_raw(raw: RawGroupConfig) -> Result<Self> {
        let mut groups = IndexMap::with_capacity(raw.groups.len());
        for (name, patterns) in raw.groups {
            if name.is_empty() {
                return Err(ElfDeltaError::config("group name must not be empty"));
            }
            let set = compile(patterns.into_vec(), &format!("groups.{}", name))?;
            groups.insert(name, set);
        }

        let mut rules = Vec::with_capacity(raw.rules.len());
        for (idx, rule) in raw.rules.into_iter().enumerate() {
            if rule.group.is_empty() {
                return Err(ElfDeltaError::config(format!(
                    "rules[{}]: group must not be empty",
                    idx
                )));
            }
            let cond = rule.conditions.unwrap_or_default();
            let mut predicates = Vec::new();
            let text_fields = [
                (TextField::SectionName, cond.section_name),
                (TextField::SectionType, cond.section_type),
                (TextField::SectionFlagsPerms, cond.section_flags_perms),
                (TextField::LoadSegmentRwx, cond.load_segment_rwx),
                (TextField::AddrSpace, cond.addr_space),
            ];
            for (field, value) in text_fields {
                if let Some(value) = value {
                    let patterns =
                        compile(value.into_vec(), &format!("rules[{}].{}", idx, field.key()))?;
                    predicates.push(Predicate::Text { field, patterns });
                }
            }
            if let Some(expected) = cond.is_nobits {
                predicates.push(Predicate::Bool {
                    field: BoolField::IsNobits,
                    expected,
                });
            }
            if let Some(expected) = cond.in_load_segment {
                predicates.push(Predicate::Bool {
                    field: BoolField::InLoadSegment,
                    expected,
                });
            }
            rules.push(Rule {
                predicates,
                group: rule.group,
            });
        }

        Ok(Self { groups, rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Name-pattern groups in configuration order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &PatternSet)> + '_ {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.rules.is_empty()
    }
}
