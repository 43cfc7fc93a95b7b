use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A historical rename or removal of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub source_schema: String,
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Where a spreadsheet column's property stands against the live schemas
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyIdentity {
    Current,
    Replaced(String),
    Removed { version: String },
    Unknown,
}

/// Body served by the migration-history endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationHistory {
    #[serde(default)]
    pub migrations: Vec<MigrationRecord>,
}

impl MigrationHistory {
    pub fn new(migrations: Vec<MigrationRecord>) -> Self {
        Self { migrations }
    }

    /// The latest record for `property` that is already in effect at `version`.
    /// Without a version every record is considered.
    pub fn lookup(&self, property: &str, version: Option<&str>) -> Option<&MigrationRecord> {
        self.migrations
            .iter()
            .filter(|record| record.property == property)
            .filter(|record| match (version, record.effective_from.as_deref()) {
                (Some(version), Some(effective)) => compare_versions(effective, version) != Ordering::Greater,
                _ => true,
            })
            .max_by(|a, b| {
                compare_versions(
                    a.effective_from.as_deref().unwrap_or("0"),
                    b.effective_from.as_deref().unwrap_or("0"),
                )
            })
    }
}

/// Compare dotted numeric versions; missing or non-numeric components count as zero
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |version: &str| -> Vec<u64> {
        version
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ordering = a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
