use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequiredState {
    #[serde(rename = "required")]
    Required,
    #[serde(rename = "not required")]
    NotRequired,
    /// Chosen through an uploaded template rather than by the schema
    #[serde(rename = "pre-selected")]
    PreSelected,
}

impl RequiredState {
    pub fn from_required(required: bool) -> Self {
        if required {
            RequiredState::Required
        } else {
            RequiredState::NotRequired
        }
    }

    pub fn is_required(self) -> bool {
        self == RequiredState::Required
    }
}

/// Which flag decides whether an ontology `.text` leaf is required
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OntologyRequiredPolicy {
    /// The wrapping property's flag (`genus_species` for `genus_species.text`)
    #[default]
    Wrapper,
    /// The leaf's own flag inside the ontology module
    Leaf,
}

/// Dotted property path to required state, in schema declaration order
pub type PropertyMap = IndexMap<String, RequiredState>;

/// The flattened view of one schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperties {
    pub title: String,
    pub name: String,
    pub properties: PropertyMap,
    /// Paths of inlined `$ref` properties with their own required state
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub modules: PropertyMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stand_alone: Vec<SchemaProperties>,
}

impl SchemaProperties {
    pub fn new(title: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            name: name.into(),
            properties: PropertyMap::new(),
            modules: PropertyMap::new(),
            stand_alone: Vec::new(),
        }
    }

    pub fn find_stand_alone(&self, name: &str) -> Option<&SchemaProperties> {
        self.stand_alone.iter().find(|group| group.name == name)
    }

    /// Main properties followed by every standalone group's properties
    pub fn all_properties(&self) -> impl Iterator<Item = (&String, &RequiredState)> {
        self.properties
            .iter()
            .chain(self.stand_alone.iter().flat_map(|group| group.properties.iter()))
    }

    /// Required state of an inlined module path, searching standalone groups too
    pub fn module_state(&self, path: &str) -> Option<RequiredState> {
        self.modules
            .get(path)
            .or_else(|| self.stand_alone.iter().find_map(|group| group.modules.get(path)))
            .copied()
    }
}

/// Replace the leading schema-name segment of `path` with `root`
pub fn reroot(path: &str, root: &str) -> String {
    match path.split_once('.') {
        Some((_, rest)) => format!("{}.{}", root, rest),
        None => root.to_string(),
    }
}

/// Split a dotted path into its schema-name segment and the rest
pub fn schema_of(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_state_uses_display_spellings() {
        assert_eq!(serde_json::to_string(&RequiredState::NotRequired).unwrap(), "\"not required\"");
        assert_eq!(serde_json::to_string(&RequiredState::PreSelected).unwrap(), "\"pre-selected\"");
    }

    #[test]
    fn reroot_replaces_only_the_first_segment() {
        assert_eq!(
            reroot("species_ontology.text", "donor_organism.genus_species"),
            "donor_organism.genus_species.text"
        );
        assert_eq!(reroot("contact", "project.contributors"), "project.contributors");
    }
}
