use crate::model::{
    RequiredState, SchemaDocument, SchemaProperties, Structure, EXCLUDED_PROPERTIES,
};

/// Direct object-valued children of a schema, for the module selection view.
///
/// Only the segment right below the schema name is considered; deeper modules
/// are not listed.
pub fn extract_references(document: &SchemaDocument, flattened: &SchemaProperties) -> Structure {
    let mut structure = Structure {
        title: flattened.title.clone(),
        name: flattened.name.clone(),
        references: Default::default(),
    };

    for (path, _) in flattened.all_properties() {
        let Some(segment) = path.split('.').nth(1) else {
            continue;
        };
        if structure.references.contains_key(segment) || EXCLUDED_PROPERTIES.contains(&segment) {
            continue;
        }
        let is_object = document
            .properties
            .get(segment)
            .and_then(|definition| definition.value_type())
            == Some("object");
        if is_object {
            structure.references.insert(
                segment.to_string(),
                RequiredState::from_required(document.is_required(segment)),
            );
        }
    }

    structure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::flatten::flatten;
    use crate::seed;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_direct_references_are_listed() {
        let catalog = seed::seed_catalog();
        let document = catalog.schema("donor_organism").unwrap();
        let flattened = flatten(document, &catalog).unwrap();

        let structure = extract_references(document, &flattened);

        assert_eq!(structure.title, "Donor organism");
        let references: Vec<(&str, RequiredState)> = structure
            .references
            .iter()
            .map(|(name, state)| (name.as_str(), *state))
            .collect();
        assert_eq!(
            references,
            vec![
                ("biomaterial_core", RequiredState::Required),
                ("timecourse", RequiredState::NotRequired),
            ]
        );
    }

    #[test]
    fn scalar_only_schemas_have_no_references() {
        let document: SchemaDocument = serde_json::from_value(serde_json::json!({
            "title": "Flat",
            "name": "flat",
            "properties": {"describedBy": {"type": "object"}, "label": {"type": "string"}}
        }))
        .unwrap();
        let mut flattened = SchemaProperties::new("Flat", "flat");
        flattened
            .properties
            .insert("flat.label".to_string(), RequiredState::NotRequired);

        assert!(extract_references(&document, &flattened).references.is_empty());
    }
}
