use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::logic::compose::Composition;
use crate::logic::metadata::{LabelPolicy, MetadataLookup};
use crate::model::{
    fits_tab_limit, humanize, schema_of, MigrationHistory, OrderingConfig, PropertyIdentity, Sheet, Workbook,
    DESCRIPTION_ROW, GUIDANCE_ROW, LABEL_ROW, PROCESS_SCHEMA, PROPERTY_ROW,
};
use crate::store::catalog::SchemaCatalog;

/// Longest `replaced_by` chain followed before giving up
pub const MAX_REPLACEMENT_HOPS: usize = 16;

/// Classify a spreadsheet property against the live catalog and the migration history.
///
/// Records newer than `version` are ignored. Renames are followed until a live
/// property is reached; a chain that never lands on one is `Unknown`.
pub fn resolve_identity(
    catalog: &SchemaCatalog,
    history: &MigrationHistory,
    path: &str,
    version: Option<&str>,
) -> PropertyIdentity {
    if catalog.contains_property(path) {
        return PropertyIdentity::Current;
    }

    let mut current = path.to_string();
    for _ in 0..MAX_REPLACEMENT_HOPS {
        let Some(record) = history.lookup(&current, version) else {
            return PropertyIdentity::Unknown;
        };
        match (&record.replaced_by, &record.effective_from) {
            (Some(next), _) if catalog.contains_property(next) => {
                return PropertyIdentity::Replaced(next.clone());
            }
            (Some(next), _) => {
                debug!("{} was replaced by {}, which is not live either", current, next);
                current = next.clone();
            }
            (None, Some(effective)) => {
                return PropertyIdentity::Removed {
                    version: effective.clone(),
                }
            }
            (None, None) => return PropertyIdentity::Unknown,
        }
    }

    warn!("Gave up following replacements of {} after {} hops", path, MAX_REPLACEMENT_HOPS);
    PropertyIdentity::Unknown
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ColumnChange {
    Current,
    Renamed { to: String },
    Removed { version: String },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOutcome {
    pub tab: String,
    pub property: String,
    #[serde(flatten)]
    pub change: ColumnChange,
}

/// What a migration did, column by column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub columns: Vec<ColumnOutcome>,
    pub skipped_tabs: Vec<String>,
    pub removed_legacy_sheet: bool,
}

impl MigrationReport {
    pub fn count(&self, matches: impl Fn(&ColumnChange) -> bool) -> usize {
        self.columns.iter().filter(|column| matches(&column.change)).count()
    }
}

/// Brings a previously exported workbook in line with the live schemas
pub struct SpreadsheetMigrator<'a> {
    catalog: &'a SchemaCatalog,
    history: &'a MigrationHistory,
    ordering: &'a OrderingConfig,
    composition: &'a Composition,
    metadata: MetadataLookup<'a>,
    labels: &'a dyn LabelPolicy,
}

impl<'a> SpreadsheetMigrator<'a> {
    pub fn new(
        catalog: &'a SchemaCatalog,
        history: &'a MigrationHistory,
        ordering: &'a OrderingConfig,
        composition: &'a Composition,
        metadata: MetadataLookup<'a>,
        labels: &'a dyn LabelPolicy,
    ) -> Self {
        Self {
            catalog,
            history,
            ordering,
            composition,
            metadata,
            labels,
        }
    }

    /// Migrate every tab of every live schema in place
    pub fn migrate(&self, workbook: &mut Workbook) -> MigrationReport {
        let mut report = MigrationReport {
            removed_legacy_sheet: workbook.remove_legacy_schemas_sheet(),
            ..MigrationReport::default()
        };

        for document in self.catalog.latest_schemas() {
            let schema = document.name();
            let version = document.version();

            let display_names = &self.composition.display_names;
            if schema == PROCESS_SCHEMA {
                for linked in self.ordering.linked_tabs(PROCESS_SCHEMA) {
                    let title = display_names.title_or_name(linked);
                    self.migrate_tab(workbook, &[title.to_string()], schema, version, linked, &mut report);
                }
                continue;
            }

            let title = display_names.title_or_name(schema);
            self.migrate_tab(workbook, &[title.to_string()], schema, version, schema, &mut report);

            for linked in self.ordering.linked_tabs(schema) {
                let candidates = self.sub_tab_candidates(title, linked);
                self.migrate_tab(workbook, &candidates, schema, version, schema, &mut report);
            }
        }

        info!(
            "Migrated workbook: {} columns renamed, {} removed, {} unknown, {} tabs skipped",
            report.count(|change| matches!(change, ColumnChange::Renamed { .. })),
            report.count(|change| matches!(change, ColumnChange::Removed { .. })),
            report.count(|change| matches!(change, ColumnChange::Unknown)),
            report.skipped_tabs.len()
        );
        report
    }

    /// Names a promoted sub-tab may carry: the bare group title, then the
    /// parent-prefixed one, then whatever the latest composition called it
    fn sub_tab_candidates(&self, parent_title: &str, key: &str) -> Vec<String> {
        let child = self
            .composition
            .sub_titles
            .get(key)
            .map(str::to_string)
            .unwrap_or_else(|| humanize(key));
        let prefixed = format!("{} - {}", parent_title, child);
        let composed = self.composition.display_names.get(key).map(str::to_string);

        [Some(child), Some(prefixed), composed]
            .into_iter()
            .flatten()
            .filter(|title| fits_tab_limit(title))
            .unique()
            .collect()
    }

    fn migrate_tab(
        &self,
        workbook: &mut Workbook,
        candidates: &[String],
        schema: &str,
        version: Option<&str>,
        tab_schema: &str,
        report: &mut MigrationReport,
    ) {
        let Some(title) = candidates.iter().find(|title| workbook.sheet(title).is_some()) else {
            let names = candidates.iter().map(|title| format!("'{}'", title)).join(" or ");
            warn!("No tab named {} in the workbook, skipping", names);
            report.skipped_tabs.extend(candidates.iter().cloned());
            return;
        };
        let Some(sheet) = workbook.sheet_mut(title) else {
            return;
        };

        let mut column = 0;
        loop {
            let property = sheet.property_at(column).to_string();
            if property.is_empty() {
                break;
            }
            if schema_of(&property) != schema {
                column += 1;
                continue;
            }

            let change = match resolve_identity(self.catalog, self.history, &property, version) {
                PropertyIdentity::Current => {
                    self.rewrite_headers(sheet, column, &property, tab_schema);
                    column += 1;
                    ColumnChange::Current
                }
                PropertyIdentity::Replaced(replacement) => {
                    debug!("{}: {} renamed to {}", sheet.name, property, replacement);
                    sheet.set_cell(PROPERTY_ROW, column, replacement.clone());
                    self.rewrite_headers(sheet, column, &replacement, tab_schema);
                    column += 1;
                    ColumnChange::Renamed { to: replacement }
                }
                PropertyIdentity::Removed { version } => {
                    debug!("{}: {} removed in {}", sheet.name, property, version);
                    sheet.delete_column(column);
                    ColumnChange::Removed { version }
                }
                PropertyIdentity::Unknown => {
                    info!("{}: {} is not a known property, leaving it", sheet.name, property);
                    column += 1;
                    ColumnChange::Unknown
                }
            };

            report.columns.push(ColumnOutcome {
                tab: sheet.name.clone(),
                property,
                change,
            });
        }
    }

    fn rewrite_headers(&self, sheet: &mut Sheet, column: usize, path: &str, tab_schema: &str) {
        let Some(metadata) = self.metadata.column(path) else {
            return;
        };
        let header = self
            .labels
            .label(&metadata.header, path, tab_schema, &self.composition.display_names);
        sheet.set_cell(LABEL_ROW, column, header);
        sheet.set_cell(DESCRIPTION_ROW, column, metadata.description);
        sheet.set_cell(GUIDANCE_ROW, column, metadata.guidance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::metadata::PlainLabels;
    use crate::logic::compose::TabComposer;
    use crate::logic::flatten::flatten_catalog;
    use crate::model::{DisplayNames, OntologyRequiredPolicy, FIRST_DATA_ROW};
    use crate::seed;
    use crate::store::traits::MigrationSource;
    use pretty_assertions::assert_eq;

    async fn history() -> MigrationHistory {
        seed::seed_migrations().fetch_history().await.unwrap()
    }

    fn named(names: DisplayNames) -> Composition {
        Composition {
            display_names: names,
            ..Composition::default()
        }
    }

    fn seed_composition(ordering: &OrderingConfig) -> Composition {
        let schemas = flatten_catalog(&seed::seed_catalog()).unwrap();
        TabComposer::new(ordering, OntologyRequiredPolicy::Wrapper).compose(&schemas)
    }

    fn sheet(name: &str, columns: &[(&str, &str)]) -> Sheet {
        let mut sheet = Sheet::new(name);
        for (column, (path, value)) in columns.iter().enumerate() {
            sheet.set_cell(LABEL_ROW, column, "OLD LABEL");
            sheet.set_cell(PROPERTY_ROW, column, *path);
            sheet.set_cell(FIRST_DATA_ROW, column, *value);
        }
        sheet
    }

    #[tokio::test]
    async fn identities_follow_the_history() {
        let catalog = seed::seed_catalog();
        let history = history().await;

        assert_eq!(
            resolve_identity(&catalog, &history, "donor_organism.sex", Some("15.5.0")),
            PropertyIdentity::Current
        );
        assert_eq!(
            resolve_identity(&catalog, &history, "donor_organism.gender", Some("15.5.0")),
            PropertyIdentity::Replaced("donor_organism.sex".to_string())
        );
        assert_eq!(
            resolve_identity(&catalog, &history, "donor_organism.ancestry", Some("15.5.0")),
            PropertyIdentity::Removed {
                version: "12.0.0".to_string()
            }
        );
        assert_eq!(
            resolve_identity(&catalog, &history, "donor_organism.ancestry", Some("11.0.0")),
            PropertyIdentity::Unknown
        );
        assert_eq!(
            resolve_identity(&catalog, &history, "donor_organism.favourite_colour", Some("15.5.0")),
            PropertyIdentity::Unknown
        );
    }

    #[tokio::test]
    async fn replacement_chains_are_followed() {
        let catalog = seed::seed_catalog();
        let mut history = history().await;
        history.migrations.push(crate::model::MigrationRecord {
            source_schema: "donor_organism".to_string(),
            property: "donor_organism.gender_identity".to_string(),
            target_schema: None,
            replaced_by: Some("donor_organism.gender".to_string()),
            effective_from: Some("3.0.0".to_string()),
            reason: None,
        });

        assert_eq!(
            resolve_identity(&catalog, &history, "donor_organism.gender_identity", Some("15.5.0")),
            PropertyIdentity::Replaced("donor_organism.sex".to_string())
        );
    }

    #[tokio::test]
    async fn columns_are_renamed_removed_refreshed_or_left() {
        let catalog = seed::seed_catalog();
        let history = history().await;
        let ordering = seed::seed_ordering();
        let composition = named(
            vec![("donor_organism".to_string(), "Donor organism".to_string())]
                .into_iter()
                .collect(),
        );
        let migrator = SpreadsheetMigrator::new(
            &catalog,
            &history,
            &ordering,
            &composition,
            MetadataLookup::new(&catalog, OntologyRequiredPolicy::Wrapper),
            &PlainLabels,
        );

        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet(
            "Donor organism",
            &[
                ("donor_organism.biomaterial_core.biomaterial_id", "donor_1"),
                ("donor_organism.gender", "female"),
                ("donor_organism.ancestry", "European"),
                ("donor_organism.favourite_colour", "green"),
                ("donor_organism.weight", "60"),
            ],
        ));
        let mut schemas = Sheet::new("Schemas");
        schemas.set_cell(0, 0, "Schemas");
        workbook.add_sheet(schemas);

        let report = migrator.migrate(&mut workbook);

        assert_eq!(workbook.sheet_names(), vec!["Donor organism"]);
        let donor = workbook.sheet("Donor organism").unwrap();
        assert_eq!(donor.property_at(0), "donor_organism.biomaterial_core.biomaterial_id");
        assert_eq!(donor.cell(LABEL_ROW, 0), "BIOMATERIAL ID (Required)");
        assert_eq!(donor.property_at(1), "donor_organism.sex");
        assert_eq!(donor.cell(LABEL_ROW, 1), "BIOLOGICAL SEX (Required)");
        assert_eq!(donor.cell(FIRST_DATA_ROW, 1), "female");
        assert_eq!(donor.property_at(2), "donor_organism.favourite_colour");
        assert_eq!(donor.cell(LABEL_ROW, 2), "OLD LABEL");
        assert_eq!(donor.property_at(3), "donor_organism.weight");
        assert_eq!(donor.cell(FIRST_DATA_ROW, 3), "60");
        assert_eq!(donor.property_at(4), "");

        assert!(report.removed_legacy_sheet);
        let changes: Vec<&ColumnChange> = report.columns.iter().map(|column| &column.change).collect();
        assert_eq!(
            changes,
            vec![
                &ColumnChange::Current,
                &ColumnChange::Renamed {
                    to: "donor_organism.sex".to_string()
                },
                &ColumnChange::Removed {
                    version: "12.0.0".to_string()
                },
                &ColumnChange::Unknown,
                &ColumnChange::Current,
            ]
        );
        assert!(report.skipped_tabs.contains(&"project".to_string()));
    }

    #[tokio::test]
    async fn scanning_stops_at_the_first_blank_property() {
        let catalog = seed::seed_catalog();
        let history = history().await;
        let ordering = seed::seed_ordering();
        let composition = named(DisplayNames::new());
        let migrator = SpreadsheetMigrator::new(
            &catalog,
            &history,
            &ordering,
            &composition,
            MetadataLookup::new(&catalog, OntologyRequiredPolicy::Wrapper),
            &PlainLabels,
        );

        let mut donor = sheet("donor_organism", &[("donor_organism.sex", "male")]);
        donor.set_cell(PROPERTY_ROW, 2, "donor_organism.ancestry");
        let mut workbook = Workbook::new();
        workbook.add_sheet(donor);

        migrator.migrate(&mut workbook);

        let donor = workbook.sheet("donor_organism").unwrap();
        assert_eq!(donor.property_at(2), "donor_organism.ancestry");
    }

    async fn migrate_contributors_sheet(title: &str) -> (Workbook, MigrationReport) {
        let catalog = seed::seed_catalog();
        let history = history().await;
        let ordering = seed::seed_ordering();
        let composition = seed_composition(&ordering);
        let migrator = SpreadsheetMigrator::new(
            &catalog,
            &history,
            &ordering,
            &composition,
            MetadataLookup::new(&catalog, OntologyRequiredPolicy::Wrapper),
            &PlainLabels,
        );

        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet(title, &[("project.contributors.name", "Jane Doe")]));
        let report = migrator.migrate(&mut workbook);
        (workbook, report)
    }

    #[tokio::test]
    async fn sub_tabs_are_found_under_their_bare_title() {
        let (workbook, report) = migrate_contributors_sheet("Contact").await;

        let contact = workbook.sheet("Contact").unwrap();
        assert!(contact.cell(LABEL_ROW, 0).starts_with("CONTACT NAME"));
        assert_eq!(contact.cell(FIRST_DATA_ROW, 0), "Jane Doe");
        assert!(!report.skipped_tabs.contains(&"Contact".to_string()));
        assert!(!report.skipped_tabs.contains(&"Project - Contact".to_string()));
    }

    #[tokio::test]
    async fn sub_tabs_are_found_under_the_prefixed_title() {
        let (workbook, report) = migrate_contributors_sheet("Project - Contact").await;

        let contact = workbook.sheet("Project - Contact").unwrap();
        assert!(contact.cell(LABEL_ROW, 0).starts_with("CONTACT NAME"));
        assert_eq!(report.columns[0].change, ColumnChange::Current);
    }

    #[tokio::test]
    async fn missing_sub_tabs_report_every_name_tried() {
        let (_, report) = migrate_contributors_sheet("Somewhere else").await;

        assert!(report.skipped_tabs.contains(&"Contact".to_string()));
        assert!(report.skipped_tabs.contains(&"Project - Contact".to_string()));
    }
}
