use indexmap::IndexMap;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Properties that describe the document itself rather than the entity
pub const EXCLUDED_PROPERTIES: [&str; 4] = ["describedBy", "schema_version", "schema_type", "provenance"];

/// A raw JSON-Schema definition as served by the schema registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(rename = "$id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDefinition>,
    #[serde(default)]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_friendly: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidelines: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsDefinition {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<Value>,
}

impl SchemaDocument {
    /// Parse a document fetched from `url`, recording the url as its identity when
    /// the document does not declare one
    pub fn from_json(url: &str, body: &str) -> serde_json::Result<Self> {
        let mut document: SchemaDocument = serde_json::from_str(body)?;
        if document.id.is_none() {
            document.id = Some(url.to_string());
        }
        Ok(document)
    }

    /// Machine name of the schema, falling back to the title like the registry does
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.title)
    }

    pub fn url(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Declared version, or the url segment preceding the concrete entity name
    /// (`.../type/biomaterial/15.5.0/donor_organism`)
    pub fn version(&self) -> Option<&str> {
        if let Some(version) = self.version.as_deref() {
            return Some(version);
        }
        let url = self.id.as_deref()?;
        let mut segments = url.trim_end_matches('/').rsplit('/');
        segments.next()?;
        segments
            .next()
            .filter(|segment| segment.chars().next().is_some_and(|c| c.is_ascii_digit()))
    }

    /// Absolute url of a `$ref` written in this document
    pub fn absolute_reference(&self, reference: &str) -> String {
        resolve_reference(self.url(), reference)
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|name| name == property)
    }

    /// Declared properties minus the document bookkeeping ones
    pub fn entity_properties(&self) -> impl Iterator<Item = (&String, &PropertyDefinition)> {
        self.properties
            .iter()
            .filter(|(name, _)| !EXCLUDED_PROPERTIES.contains(&name.as_str()))
    }
}

impl PropertyDefinition {
    pub fn items_reference(&self) -> Option<&str> {
        self.items.as_ref().and_then(|items| items.reference.as_deref())
    }

    /// JSON type of the value; `$ref` properties are objects
    pub fn value_type(&self) -> Option<&str> {
        if self.reference.is_some() {
            return Some("object");
        }
        match &self.value_type {
            Some(Value::String(value_type)) => Some(value_type.as_str()),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|value_type| *value_type != "null"),
            _ => None,
        }
    }

    /// Example rendered the way it should appear in a spreadsheet cell
    pub fn example_text(&self) -> Option<String> {
        match self.example.as_ref()? {
            Value::Null => None,
            Value::String(text) if text.trim().is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Absolute url of `reference` as seen from the document at `base`
pub fn resolve_reference(base: Option<&str>, reference: &str) -> String {
    if reference.contains("://") {
        return reference.to_string();
    }
    base.and_then(|base| Url::parse(base).ok())
        .and_then(|base| base.join(reference).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| reference.to_string())
}

/// Ontology modules are inlined rather than promoted to their own tab
pub fn is_ontology_reference(reference: &str) -> bool {
    reference.contains("/ontology/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_taken_from_the_url_when_not_declared() {
        let document = SchemaDocument::from_json(
            "https://schema.example.org/type/biomaterial/15.5.0/donor_organism",
            r#"{"title": "Donor organism", "properties": {}}"#,
        )
        .unwrap();

        assert_eq!(document.version(), Some("15.5.0"));
        assert_eq!(document.name(), "Donor organism");
    }

    #[test]
    fn reference_properties_are_objects() {
        let definition: PropertyDefinition =
            serde_json::from_str(r#"{"$ref": "https://schema.example.org/module/ontology/5.3.0/species_ontology"}"#)
                .unwrap();
        assert_eq!(definition.value_type(), Some("object"));

        let nullable: PropertyDefinition = serde_json::from_str(r#"{"type": ["null", "integer"]}"#).unwrap();
        assert_eq!(nullable.value_type(), Some("integer"));
    }

    #[test]
    fn relative_references_are_joined_to_the_referring_document() {
        assert_eq!(
            resolve_reference(
                Some("https://schema.example.org/type/biomaterial/15.5.0/donor_organism"),
                "../../../module/ontology/5.3.0/species_ontology"
            ),
            "https://schema.example.org/module/ontology/5.3.0/species_ontology"
        );
        assert_eq!(
            resolve_reference(None, "https://schema.example.org/core/biomaterial/8.6.1/biomaterial_core"),
            "https://schema.example.org/core/biomaterial/8.6.1/biomaterial_core"
        );
    }

    #[test]
    fn excluded_properties_are_not_entity_properties() {
        let document: SchemaDocument = serde_json::from_str(
            r#"{
                "title": "Cell line",
                "name": "cell_line",
                "properties": {
                    "describedBy": {"type": "string"},
                    "schema_type": {"type": "string"},
                    "cell_line_type": {"type": "string"}
                }
            }"#,
        )
        .unwrap();

        let names: Vec<&String> = document.entity_properties().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["cell_line_type"]);
    }
}
