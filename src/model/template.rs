use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TemplateError};
use crate::model::{schema_of, DisplayNames, Tab};

/// The YAML interchange document between the selection and export steps
///
/// ```yaml
/// tabs:
/// - donor_organism:
///     display_name: Donor organism
///     columns:
///     - donor_organism.biomaterial_core.biomaterial_id
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub tabs: Vec<IndexMap<String, TemplateTab>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateTab {
    pub display_name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Separator used by the selection UI for columns typed in by the user
pub const CUSTOM_PROPERTY_SEPARATOR: char = ':';

impl TemplateDocument {
    /// One tab per selected schema holding the selected properties that belong to it.
    ///
    /// A property belongs to the selected promoted tab named by one of its inner
    /// segments (`project.contributors.name` goes to `contributors`), then to the
    /// tab of its schema, then to the first selected tab whose composed columns
    /// carry it (process fields, linking columns). `<tab>:<path>` pins a path to
    /// the tab it was picked on. Custom columns arrive as `<schema>:<property>`
    /// and are stored as `<schema>.<property>`.
    pub fn from_selection(
        schemas: &[String],
        properties: &[String],
        tabs: &[Tab],
        display_names: &DisplayNames,
    ) -> Self {
        let mut columns: IndexMap<&str, Vec<String>> =
            schemas.iter().map(|schema| (schema.as_str(), Vec::new())).collect();
        for property in properties {
            match selected_column(property, schemas, tabs) {
                Some((owner, column)) => {
                    let owned = columns.entry(owner).or_default();
                    if !owned.contains(&column) {
                        owned.push(column);
                    }
                }
                None => debug!("'{}' belongs to no selected tab, dropping it", property),
            }
        }

        let tabs = columns
            .into_iter()
            .map(|(schema, columns)| {
                let tab = TemplateTab {
                    display_name: display_names.title_or_name(schema).to_string(),
                    columns,
                };
                IndexMap::from([(schema.to_string(), tab)])
            })
            .collect();
        Self { tabs }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| TemplateError::MalformedUpload(format!("not a YAML document: {}", e)))?;
        if value.get("tabs").is_none() {
            return Err(TemplateError::MalformedUpload(
                "document has no 'tabs' section".to_string(),
            ));
        }
        serde_yaml::from_value(value)
            .map_err(|e| TemplateError::MalformedUpload(format!("invalid 'tabs' section: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| TemplateError::Template(e.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TemplateTab)> {
        self.tabs.iter().flat_map(|entry| entry.iter())
    }
}

fn selected_column<'a>(property: &str, selected: &'a [String], tabs: &[Tab]) -> Option<(&'a str, String)> {
    if let Some((owner, rest)) = property.split_once(CUSTOM_PROPERTY_SEPARATOR) {
        let owner = selected_tab(selected, owner.trim())?;
        let rest = rest.trim();
        return match rest {
            "" => None,
            path if path.contains('.') => Some((owner, path.to_string())),
            custom => Some((owner, format!("{}.{}", owner, custom))),
        };
    }
    owning_tab(property, selected, tabs).map(|owner| (owner, property.to_string()))
}

fn owning_tab<'a>(property: &str, selected: &'a [String], tabs: &[Tab]) -> Option<&'a str> {
    property
        .split('.')
        .skip(1)
        .find_map(|segment| selected_tab(selected, segment))
        .or_else(|| selected_tab(selected, schema_of(property)))
        .or_else(|| {
            selected
                .iter()
                .find(|name| {
                    tabs.iter()
                        .any(|tab| &tab.name == *name && tab.properties.contains_key(property))
                })
                .map(String::as_str)
        })
}

fn selected_tab<'a>(selected: &'a [String], name: &str) -> Option<&'a str> {
    selected.iter().find(|candidate| *candidate == name).map(String::as_str)
}
