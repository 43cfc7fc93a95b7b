use serde::{Deserialize, Serialize};

use crate::model::{humanize, schema_of, DisplayNames, OntologyRequiredPolicy, PropertyDefinition};
use crate::store::catalog::{PropertyInfo, SchemaCatalog};

/// The three human-readable header rows of one spreadsheet column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub header: String,
    pub description: String,
    pub guidance: String,
}

/// Rewrites a column header for the tab it appears on; `tab_schema` is the schema
/// owning that tab
pub trait LabelPolicy: Send + Sync {
    fn label(&self, header: &str, path: &str, tab_schema: &str, display_names: &DisplayNames) -> String;
}

/// Headers as the schema spells them
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLabels;

impl LabelPolicy for PlainLabels {
    fn label(&self, header: &str, _path: &str, _tab_schema: &str, _display_names: &DisplayNames) -> String {
        header.to_string()
    }
}

/// Headers naming the concrete entity instead of the generic core module.
///
/// `BIOMATERIAL ID` on the donor tab reads `DONOR ORGANISM ID`; the same column
/// linked into the specimen tab reads `INPUT DONOR ORGANISM ID`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityLabels;

impl LabelPolicy for EntityLabels {
    fn label(&self, header: &str, path: &str, tab_schema: &str, display_names: &DisplayNames) -> String {
        let generic = match path.split('.').nth(1) {
            Some("biomaterial_core") => "BIOMATERIAL",
            Some("protocol_core") => "PROTOCOL",
            _ => return header.to_string(),
        };
        let schema = schema_of(path);
        let entity = display_names.title_or_name(schema).to_uppercase();

        let label = header.replacen(generic, &entity, 1);
        if schema == tab_schema {
            label
        } else {
            format!("INPUT {}", label)
        }
    }
}

/// Pick a label policy by its configured name
pub fn label_policy(name: &str) -> Box<dyn LabelPolicy> {
    match name {
        "plain" => Box::new(PlainLabels),
        _ => Box::new(EntityLabels),
    }
}

/// Looks up header rows for dotted paths against the live catalog
pub struct MetadataLookup<'a> {
    catalog: &'a SchemaCatalog,
    policy: OntologyRequiredPolicy,
}

impl<'a> MetadataLookup<'a> {
    pub fn new(catalog: &'a SchemaCatalog, policy: OntologyRequiredPolicy) -> Self {
        Self { catalog, policy }
    }

    /// Metadata for a column of `path`, or `None` when the catalog does not know it
    pub fn column(&self, path: &str) -> Option<ColumnMetadata> {
        let leaf = self.catalog.property(path)?;
        let wrapper = ontology_wrapper(path).and_then(|parent| self.catalog.property(parent));

        let preferred = wrapper.map(|info| info.definition);
        let pick = |field: fn(&PropertyDefinition) -> Option<String>| {
            preferred
                .and_then(field)
                .or_else(|| field(leaf.definition))
        };

        let label = pick(|definition| non_empty(definition.user_friendly.as_deref()))
            .unwrap_or_else(|| humanize(leaf.name));
        let description = pick(|definition| non_empty(definition.description.as_deref())).unwrap_or_default();
        let guideline = pick(|definition| non_empty(definition.guidelines.as_deref()));
        let example = pick(PropertyDefinition::example_text);

        let required = match (self.policy, wrapper) {
            (OntologyRequiredPolicy::Wrapper, Some(PropertyInfo { required, .. })) => required,
            _ => leaf.required,
        };

        let mut header = label.to_uppercase();
        if required {
            header.push_str(" (Required)");
        }

        let guidance = match (guideline, example) {
            (Some(guideline), Some(example)) => format!("{} For example: {}", guideline, example),
            (Some(guideline), None) => guideline,
            (None, Some(example)) => format!("For example: {}", example),
            (None, None) => String::new(),
        };

        Some(ColumnMetadata {
            header,
            description,
            guidance,
        })
    }
}

/// `donor.genus_species` for `donor.genus_species.text`
fn ontology_wrapper(path: &str) -> Option<&str> {
    let parent = path.strip_suffix(".text")?;
    parent.contains('.').then_some(parent)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
