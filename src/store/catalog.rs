use indexmap::IndexMap;
use log::{debug, info};

use crate::error::{Result, TemplateError};
use crate::model::{resolve_reference, PropertyDefinition, SchemaDocument};
use crate::store::traits::{SchemaRegistry, SchemaResolver};

/// Every latest entity schema plus every document reachable from them through `$ref`
///
/// Loaded once per schema-processing pass so that flattening, metadata lookups and
/// migration can resolve references without going back to the network.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    documents: IndexMap<String, SchemaDocument>,
    /// Entity schema name to document url
    latest: IndexMap<String, String>,
}

/// A property located by dotted path, with the document that declares it
#[derive(Debug, Clone, Copy)]
pub struct PropertyInfo<'a> {
    pub schema: &'a SchemaDocument,
    pub name: &'a str,
    pub definition: &'a PropertyDefinition,
    pub required: bool,
}

impl SchemaCatalog {
    pub async fn load<R: SchemaRegistry + ?Sized>(registry: &R) -> Result<Self> {
        let mut catalog = SchemaCatalog::default();
        let urls = registry.latest_schema_urls().await?;

        for url in urls {
            let document = registry.fetch_schema(&url).await?;
            catalog.latest.insert(document.name().to_string(), url.clone());
            catalog.documents.insert(url, document);
        }

        let mut pending: Vec<String> = catalog
            .documents
            .iter()
            .flat_map(|(url, document)| references_of(url, document))
            .collect();
        while let Some(url) = pending.pop() {
            if catalog.documents.contains_key(&url) {
                continue;
            }
            debug!("Prefetching referenced schema {}", url);
            let document = registry.fetch_schema(&url).await?;
            pending.extend(references_of(&url, &document));
            catalog.documents.insert(url, document);
        }

        info!(
            "Loaded {} entity schemas ({} documents including modules)",
            catalog.latest.len(),
            catalog.documents.len()
        );
        Ok(catalog)
    }

    /// Build a catalog from documents already in memory; `latest` are the entity
    /// schemas, `modules` only serve reference resolution
    pub fn from_documents(latest: Vec<SchemaDocument>, modules: Vec<SchemaDocument>) -> Self {
        let mut catalog = SchemaCatalog::default();
        for document in latest {
            let url = document_key(&document);
            catalog.latest.insert(document.name().to_string(), url.clone());
            catalog.documents.insert(url, document);
        }
        for document in modules {
            catalog.documents.insert(document_key(&document), document);
        }
        catalog
    }

    /// Latest entity schemas in registry order
    pub fn latest_schemas(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.latest.values().filter_map(|url| self.documents.get(url))
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaDocument> {
        self.latest.get(name).and_then(|url| self.documents.get(url))
    }

    /// Follow a dotted path (`donor_organism.genus_species.text`) through `$ref`s
    pub fn property(&self, path: &str) -> Option<PropertyInfo<'_>> {
        let mut segments = path.split('.');
        let mut document = self.schema(segments.next()?)?;
        let mut segments = segments.peekable();

        while let Some(segment) = segments.next() {
            let (name, definition) = document.properties.get_key_value(segment)?;
            if segments.peek().is_none() {
                return Some(PropertyInfo {
                    schema: document,
                    name: name.as_str(),
                    definition,
                    required: document.is_required(segment),
                });
            }
            let reference = definition
                .reference
                .as_deref()
                .or_else(|| definition.items_reference())?;
            let url = resolve_reference(document.url(), reference);
            document = self.documents.get(&url)?;
        }
        None
    }

    pub fn contains_property(&self, path: &str) -> bool {
        self.property(path).is_some()
    }
}

impl SchemaResolver for SchemaCatalog {
    fn resolve(&self, reference: &str) -> Result<&SchemaDocument> {
        self.documents
            .get(reference)
            .ok_or_else(|| TemplateError::malformed_schema(reference, "referenced schema was not loaded"))
    }
}

fn references_of(url: &str, document: &SchemaDocument) -> Vec<String> {
    document
        .properties
        .values()
        .filter_map(|definition| {
            definition
                .reference
                .as_deref()
                .or_else(|| definition.items_reference())
        })
        .map(|reference| resolve_reference(Some(url), reference))
        .collect()
}

fn document_key(document: &SchemaDocument) -> String {
    document
        .url()
        .map(str::to_string)
        .unwrap_or_else(|| document.name().to_string())
}
