use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{PropertyMap, RequiredState};

/// Spreadsheet applications reject sheet names of this length or longer
pub const TAB_TITLE_LIMIT: usize = 32;

/// One user-facing group of columns: a spreadsheet sheet or a YAML template entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub name: String,
    pub title: String,
    pub properties: PropertyMap,
    pub select: bool,
}

impl Tab {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            properties: PropertyMap::new(),
            select: false,
        }
    }

    pub fn first_property(&self) -> Option<&str> {
        self.properties.keys().next().map(String::as_str)
    }

    /// Tabs start selected in the UI when they carry anything mandatory
    pub fn refresh_selection(&mut self) {
        self.select = self.properties.values().any(|state| state.is_required());
    }

    /// Add a column unless the tab already owns it
    pub fn add_optional(&mut self, path: &str) {
        self.properties
            .entry(path.to_string())
            .or_insert(RequiredState::NotRequired);
    }
}

pub fn fits_tab_limit(title: &str) -> bool {
    title.chars().count() < TAB_TITLE_LIMIT
}

/// Title of a promoted sub-tab: "<parent> - <child>" when it fits, the child alone otherwise
pub fn sub_tab_title(parent_title: &str, child_title: &str) -> Option<String> {
    let combined = format!("{} - {}", parent_title, child_title);
    if fits_tab_limit(&combined) {
        Some(combined)
    } else if fits_tab_limit(child_title) {
        Some(child_title.to_string())
    } else {
        None
    }
}

/// Schema or tab identifier to display title
///
/// Produced fresh by every composition pass and replaced wholesale by its holder,
/// so titles of schemas that disappeared from the registry do not linger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayNames {
    titles: IndexMap<String, String>,
}

impl DisplayNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, title: impl Into<String>) {
        self.titles.insert(name.into(), title.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.titles.get(name).map(String::as_str)
    }

    /// Title for `name`, or the name itself when it was never displayed
    pub fn title_or_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).unwrap_or(name)
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl FromIterator<(String, String)> for DisplayNames {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            titles: iter.into_iter().collect(),
        }
    }
}

/// Which modules a schema links to, without descending into them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub title: String,
    pub name: String,
    pub references: PropertyMap,
}

/// Humanize a machine name: `cell_suspension` -> `Cell suspension`
pub fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
