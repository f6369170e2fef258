//! Rule-based section classification.
//!
//! A record is assigned to exactly one group by an ordered cascade:
//! explicit rules first, then name-pattern groups, then a group derived
//! from the section name. The first stage that yields a group wins.

pub mod config;
pub mod profiles;
pub mod wildcard;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub use config::GroupConfig;
pub use profiles::Profile;

use crate::scan::record::SectionRecord;

/// One step of the classification cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Rules,
    NameGroups,
    DerivedName,
}

impl Stage {
    /// Evaluation order.
    pub const CASCADE: [Stage; 3] = [Stage::Rules, Stage::NameGroups, Stage::DerivedName];

    pub fn apply(&self, record: &SectionRecord, config: &GroupConfig) -> Option<String> {
        match self {
            Stage::Rules => config
                .rules()
                .iter()
                .find(|rule| rule.matches(record))
                .map(|rule| rule.group.clone()),
            Stage::NameGroups => config
                .groups()
                .find(|(_, patterns)| patterns.matches(&record.section_name))
                .map(|(name, _)| name.to_string()),
            Stage::DerivedName => Some(derived_group(&record.section_name)),
        }
    }
}

/// Fallback group: the name without one leading `.`, uppercased.
pub fn derived_group(section_name: &str) -> String {
    section_name
        .strip_prefix('.')
        .unwrap_or(section_name)
        .to_uppercase()
}

/// Classify a record and report which stage decided.
pub fn classify_with_stage(record: &SectionRecord, config: &GroupConfig) -> (String, Stage) {
    for stage in Stage::CASCADE {
        if let Some(group) = stage.apply(record, config) {
            trace!(section = %record.section_name, group = %group, ?stage, "Classified");
            return (group, stage);
        }
    }
    // DerivedName always yields a group.
    (derived_group(&record.section_name), Stage::DerivedName)
}

pub fn classify(record: &SectionRecord, config: &GroupConfig) -> String {
    classify_with_stage(record, config).0
}

/// A section record with its assigned group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: SectionRecord,
    pub group: String,
}

impl ClassifiedRecord {
    pub fn new(record: SectionRecord, config: &GroupConfig) -> Self {
        let group = classify(&record, config);
        Self { record, group }
    }
}

/// Classify a whole record stream, keeping its order.
pub fn classify_records<I>(records: I, config: &GroupConfig) -> Vec<ClassifiedRecord>
where
    I: IntoIterator<Item = SectionRecord>,
{
    records
        .into_iter()
        .map(|r| ClassifiedRecord::new(r, config))
        .collect()
}
