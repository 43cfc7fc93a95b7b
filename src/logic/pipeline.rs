use log::info;
use std::time::Instant;

use crate::error::{Result, TemplateError};
use crate::logic::compose::{Composition, TabComposer};
use crate::logic::flatten::flatten_catalog;
use crate::logic::metadata::{LabelPolicy, MetadataLookup};
use crate::logic::migrate::{MigrationReport, SpreadsheetMigrator};
use crate::logic::references::extract_references;
use crate::model::{DisplayNames, OntologyRequiredPolicy, OrderingConfig, SchemaProperties, Structure};
use crate::store::catalog::SchemaCatalog;
use crate::store::traits::{MigrationSource, SchemaRegistry};
use crate::store::xlsx;

/// Everything one schema-processing pass produces
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub catalog: SchemaCatalog,
    pub flattened: Vec<SchemaProperties>,
    pub composition: Composition,
    pub structures: Vec<Structure>,
}

impl SchemaSnapshot {
    pub fn display_names(&self) -> &DisplayNames {
        &self.composition.display_names
    }

    pub fn metadata(&self, policy: OntologyRequiredPolicy) -> MetadataLookup<'_> {
        MetadataLookup::new(&self.catalog, policy)
    }
}

/// Fetch, flatten and compose in one go
pub struct SchemaPipeline<'a> {
    ordering: &'a OrderingConfig,
    policy: OntologyRequiredPolicy,
}

impl<'a> SchemaPipeline<'a> {
    pub fn new(ordering: &'a OrderingConfig, policy: OntologyRequiredPolicy) -> Self {
        Self { ordering, policy }
    }

    pub async fn run<R: SchemaRegistry + ?Sized>(&self, registry: &R) -> Result<SchemaSnapshot> {
        let start = Instant::now();
        let catalog = SchemaCatalog::load(registry).await?;
        let snapshot = self.from_catalog(catalog)?;
        info!(
            "Schema pass produced {} tabs in {:.2?}",
            snapshot.composition.tabs.len(),
            start.elapsed()
        );
        Ok(snapshot)
    }

    /// Run the pure steps over a catalog already in memory
    pub fn from_catalog(&self, catalog: SchemaCatalog) -> Result<SchemaSnapshot> {
        let flattened = flatten_catalog(&catalog)?;
        let composition = TabComposer::new(self.ordering, self.policy).compose(&flattened);

        let mut structures = Vec::with_capacity(flattened.len());
        for properties in &flattened {
            let document = catalog.schema(&properties.name).ok_or_else(|| {
                TemplateError::malformed_schema(&properties.name, "flattened schema is missing from the catalog")
            })?;
            structures.push(extract_references(document, properties));
        }

        Ok(SchemaSnapshot {
            catalog,
            flattened,
            composition,
            structures,
        })
    }

    /// Migrate an uploaded `.xlsx` against the live schemas and the migration history
    pub async fn migrate_workbook<R, M>(
        &self,
        registry: &R,
        migrations: &M,
        labels: &dyn LabelPolicy,
        bytes: Vec<u8>,
    ) -> Result<(Vec<u8>, MigrationReport)>
    where
        R: SchemaRegistry + ?Sized,
        M: MigrationSource + ?Sized,
    {
        let mut workbook = xlsx::read_workbook(bytes).map_err(|e| match e {
            TemplateError::Workbook(reason) => TemplateError::MalformedUpload(reason),
            other => other,
        })?;
        let snapshot = self.run(registry).await?;
        let history = migrations.fetch_history().await?;

        let migrator = SpreadsheetMigrator::new(
            &snapshot.catalog,
            &history,
            self.ordering,
            &snapshot.composition,
            snapshot.metadata(self.policy),
            labels,
        );
        let report = migrator.migrate(&mut workbook);

        Ok((xlsx::write_workbook(&workbook)?, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[tokio::test]
    async fn a_pass_over_the_seed_registry_yields_tabs_and_modules() {
        let ordering = seed::seed_ordering();
        let pipeline = SchemaPipeline::new(&ordering, OntologyRequiredPolicy::Wrapper);

        let snapshot = pipeline.run(&seed::seed_registry()).await.unwrap();

        assert_eq!(snapshot.flattened.len(), 5);
        assert_eq!(snapshot.structures.len(), 5);
        assert_eq!(snapshot.composition.tabs[0].name, "project");
        assert_eq!(snapshot.display_names().get("contributors"), Some("Project - Contact"));
    }
}
