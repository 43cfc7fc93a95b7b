use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the schema whose fields are shared by several tabs
pub const PROCESS_SCHEMA: &str = "process";

/// Tab ordering and linking declarations
///
/// ```toml
/// [ordering]
/// project = ""
/// contributors = "project"
/// donor_organism = "process"
///
/// [biomaterial_linking]
/// specimen_from_organism = "donor_organism"
///
/// [protocol_linking]
/// specimen_from_organism = "collection_protocol, dissociation_protocol"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderingConfig {
    #[serde(default)]
    pub ordering: IndexMap<String, String>,
    #[serde(default)]
    pub biomaterial_linking: IndexMap<String, String>,
    #[serde(default)]
    pub protocol_linking: IndexMap<String, String>,
}

/// How one `ordering` entry is turned into a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingEntry<'a> {
    /// The key is a schema with a tab of its own
    Schema,
    /// A schema tab that also carries the process fields
    ProcessSchema,
    /// The key is a property group promoted out of `parent`
    SubTab { parent: &'a str },
}

impl OrderingConfig {
    /// Load from a file; the extension picks the format (toml, yaml, json, ini)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, OrderingEntry<'_>)> {
        self.ordering.iter().map(|(key, value)| {
            let value = value.trim();
            let entry = if value.is_empty() {
                OrderingEntry::Schema
            } else if value == PROCESS_SCHEMA {
                OrderingEntry::ProcessSchema
            } else {
                OrderingEntry::SubTab { parent: value }
            };
            (key.as_str(), entry)
        })
    }

    /// Keys declared as linked to `parent`: promoted sub-tabs of a schema, or the
    /// process-carrying tabs when `parent` is the process schema
    pub fn linked_tabs<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.ordering
            .iter()
            .filter(move |(_, value)| value.trim() == parent)
            .map(|(key, _)| key.as_str())
    }

    pub fn protocols_for<'a>(&'a self, biomaterial: &str) -> Vec<&'a str> {
        self.protocol_linking
            .get(biomaterial)
            .map(|protocols| {
                protocols
                    .split(',')
                    .map(str::trim)
                    .filter(|protocol| !protocol.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
