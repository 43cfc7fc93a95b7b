use log::debug;

use crate::error::{Result, TemplateError};
use crate::model::{is_ontology_reference, reroot, RequiredState, SchemaDocument, SchemaProperties};
use crate::store::catalog::SchemaCatalog;
use crate::store::traits::SchemaResolver;

/// Flatten one schema into dotted leaf paths.
///
/// `$ref` properties and arrays of ontology references are inlined under the
/// referring property's path. Arrays of any other reference become standalone
/// groups so they can be promoted to their own tab. Required state is the one
/// declared at each leaf's own level; the composer decides effective requiredness.
///
/// Fails as a whole when any referenced schema cannot be resolved.
pub fn flatten<R: SchemaResolver + ?Sized>(document: &SchemaDocument, resolver: &R) -> Result<SchemaProperties> {
    let mut visiting = Vec::new();
    flatten_document(document, resolver, &mut visiting)
}

/// Flatten every latest schema of the catalog, in registry order
pub fn flatten_catalog(catalog: &SchemaCatalog) -> Result<Vec<SchemaProperties>> {
    catalog
        .latest_schemas()
        .map(|document| flatten(document, catalog))
        .collect()
}

fn flatten_document<R: SchemaResolver + ?Sized>(
    document: &SchemaDocument,
    resolver: &R,
    visiting: &mut Vec<String>,
) -> Result<SchemaProperties> {
    let identity = document.url().unwrap_or_else(|| document.name()).to_string();
    if visiting.contains(&identity) {
        return Err(TemplateError::malformed_schema(&identity, "schema references itself"));
    }
    visiting.push(identity);

    let name = document.name();
    let mut flattened = SchemaProperties::new(document.title.clone(), name);

    for (property, definition) in document.entity_properties() {
        let path = format!("{}.{}", name, property);
        let state = RequiredState::from_required(document.is_required(property));

        if let Some(reference) = definition.reference.as_deref() {
            let nested = flatten_reference(document, reference, resolver, visiting)?;
            inline(&mut flattened, &path, state, nested);
        } else if let Some(reference) = definition.items_reference() {
            let nested = flatten_reference(document, reference, resolver, visiting)?;
            if is_ontology_reference(reference) {
                inline(&mut flattened, &path, state, nested);
            } else {
                debug!("{} is a standalone group of {}", path, nested.name);
                add_stand_alone(&mut flattened, &path, property, state, nested);
            }
        } else {
            flattened.properties.insert(path, state);
        }
    }

    visiting.pop();
    Ok(flattened)
}

fn flatten_reference<R: SchemaResolver + ?Sized>(
    document: &SchemaDocument,
    reference: &str,
    resolver: &R,
    visiting: &mut Vec<String>,
) -> Result<SchemaProperties> {
    let url = document.absolute_reference(reference);
    let referenced = resolver.resolve(&url)?;
    flatten_document(referenced, resolver, visiting)
}

/// Merge a referenced schema's leaves under `path`
fn inline(target: &mut SchemaProperties, path: &str, state: RequiredState, nested: SchemaProperties) {
    target.modules.insert(path.to_string(), state);
    for (key, value) in nested.modules {
        target.modules.insert(reroot(&key, path), value);
    }
    for (key, value) in nested.properties {
        target.properties.insert(reroot(&key, path), value);
    }
    let owner = nested.name;
    for group in nested.stand_alone {
        push_group(target, reroot_group(group, path), &owner);
    }
}

/// Keep an array-referenced schema apart from the main map
fn add_stand_alone(
    target: &mut SchemaProperties,
    path: &str,
    property: &str,
    state: RequiredState,
    nested: SchemaProperties,
) {
    target.modules.insert(path.to_string(), state);

    let mut group = SchemaProperties::new(nested.title, property);
    group.properties = nested
        .properties
        .into_iter()
        .map(|(key, value)| (reroot(&key, path), value))
        .collect();
    group.modules = nested
        .modules
        .into_iter()
        .map(|(key, value)| (reroot(&key, path), value))
        .collect();

    let owner = target.name.clone();
    push_group(target, group, &owner);

    let nested_owner = property.to_string();
    for inner in nested.stand_alone {
        push_group(target, reroot_group(inner, path), &nested_owner);
    }
}

fn reroot_group(group: SchemaProperties, path: &str) -> SchemaProperties {
    SchemaProperties {
        properties: group
            .properties
            .into_iter()
            .map(|(key, value)| (reroot(&key, path), value))
            .collect(),
        modules: group
            .modules
            .into_iter()
            .map(|(key, value)| (reroot(&key, path), value))
            .collect(),
        ..group
    }
}

/// Append a standalone group, prefixing its name with `owner` when it is taken
fn push_group(target: &mut SchemaProperties, mut group: SchemaProperties, owner: &str) {
    if target.find_stand_alone(&group.name).is_some() {
        group.name = format!("{}_{}", owner, group.name);
    }
    target.stand_alone.push(group);
}
