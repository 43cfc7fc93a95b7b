use pretty_assertions::assert_eq;
use schema_template_generator::logic::migrate::ColumnChange;
use schema_template_generator::logic::{apply_template, preselected_paths, PlainLabels, SchemaPipeline};
use schema_template_generator::model::{
    OntologyRequiredPolicy, OrderingConfig, RequiredState, Sheet, TemplateDocument, Workbook, FIRST_DATA_ROW,
    LABEL_ROW, PROPERTY_ROW, TAB_TITLE_LIMIT,
};
use schema_template_generator::seed;
use schema_template_generator::store::{xlsx, InMemoryMigrations, InMemoryRegistry, SchemaCatalog};
use schema_template_generator::SchemaDocument;
use std::collections::HashSet;
use std::io::Write;

async fn snapshot(ordering: &OrderingConfig) -> schema_template_generator::SchemaSnapshot {
    SchemaPipeline::new(ordering, OntologyRequiredPolicy::Wrapper)
        .run(&seed::seed_registry())
        .await
        .unwrap()
}

#[tokio::test]
async fn promotion_keeps_every_path_exactly_once() {
    let ordering = seed::seed_ordering();
    let snapshot = snapshot(&ordering).await;

    let project = snapshot
        .flattened
        .iter()
        .find(|schema| schema.name == "project")
        .unwrap();
    let original: HashSet<&String> = project.all_properties().map(|(path, _)| path).collect();

    let mut seen = HashSet::new();
    for tab in &snapshot.composition.tabs {
        if !["project", "contributors", "funders"].contains(&tab.name.as_str()) {
            continue;
        }
        for path in tab.properties.keys() {
            assert!(seen.insert(path), "{} appears on two tabs", path);
        }
    }
    assert_eq!(seen, original);
}

#[tokio::test]
async fn process_fields_are_never_required() {
    let ordering = seed::seed_ordering();
    let snapshot = snapshot(&ordering).await;

    for tab in &snapshot.composition.tabs {
        for (path, state) in &tab.properties {
            if path.starts_with("process.") {
                assert_eq!(*state, RequiredState::NotRequired, "{} on {}", path, tab.name);
            }
        }
    }
}

#[tokio::test]
async fn tabs_follow_the_config_file_order() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        "[ordering]\ncollection_protocol = \"\"\ndonor_organism = \"process\"\nproject = \"\"\nmissing_schema = \"\"\n"
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let ordering = OrderingConfig::load(&path).unwrap();
    let snapshot = snapshot(&ordering).await;

    let names: Vec<&str> = snapshot
        .composition
        .tabs
        .iter()
        .map(|tab| tab.name.as_str())
        .collect();
    assert_eq!(names, vec!["collection_protocol", "donor_organism", "project"]);
    let project = &snapshot.composition.tabs[2];
    assert!(project.properties.contains_key("project.contributors.name"));
}

#[tokio::test]
async fn titles_always_fit_a_sheet_name() {
    let long_parent = SchemaDocument::from_json(
        "https://schema.example.org/type/protocol/1.0.0/imaging_preparation_protocol",
        r#"{
            "title": "Imaging preparation protocol for tissues",
            "name": "imaging_preparation_protocol",
            "properties": {
                "label": {"type": "string"},
                "expansion_factor_measurements": {
                    "type": "array",
                    "items": {"$ref": "https://schema.example.org/module/protocol/1.0.0/measurement"}
                }
            }
        }"#,
    )
    .unwrap();
    let module = SchemaDocument::from_json(
        "https://schema.example.org/module/protocol/1.0.0/measurement",
        r#"{"title": "Expansion factor measurement details", "name": "measurement",
            "properties": {"value": {"type": "number"}}}"#,
    )
    .unwrap();
    let registry = InMemoryRegistry::new()
        .with_schema(long_parent)
        .with_module(module);
    let ordering = OrderingConfig::from_toml(
        "[ordering]\nimaging_preparation_protocol = \"\"\nexpansion_factor_measurements = \"imaging_preparation_protocol\"\n",
    )
    .unwrap();

    let snapshot = SchemaPipeline::new(&ordering, OntologyRequiredPolicy::Wrapper)
        .run(&registry)
        .await
        .unwrap();

    assert_eq!(snapshot.composition.tabs.len(), 2);
    let promoted = &snapshot.composition.tabs[1];
    assert_eq!(promoted.title, "Expansion factor measurements");
    assert!(promoted.title.chars().count() < TAB_TITLE_LIMIT);
}

#[tokio::test]
async fn yaml_templates_round_trip_the_selection() {
    let ordering = seed::seed_ordering();
    let snapshot = snapshot(&ordering).await;
    let selected = vec![
        "donor_organism.weight".to_string(),
        "donor_organism.timecourse.value".to_string(),
        "specimen_from_organism.storage_method".to_string(),
    ];

    let template = TemplateDocument::from_selection(
        &["donor_organism".to_string(), "specimen_from_organism".to_string()],
        &selected,
        &snapshot.composition.tabs,
        snapshot.display_names(),
    );
    let reloaded = TemplateDocument::from_yaml(&template.to_yaml().unwrap()).unwrap();
    assert_eq!(reloaded, template);

    let mut tabs = snapshot.composition.tabs.clone();
    apply_template(&mut tabs, &reloaded);
    let mut paths = preselected_paths(&tabs);
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "donor_organism.timecourse.value",
            "donor_organism.weight",
            "specimen_from_organism.storage_method"
        ]
    );
}

#[tokio::test]
async fn process_and_linking_columns_survive_the_yaml_round_trip() {
    let ordering = seed::seed_ordering();
    let snapshot = snapshot(&ordering).await;
    let selected = vec![
        "specimen_from_organism.storage_method".to_string(),
        "process.process_core.process_id".to_string(),
        "donor_organism.biomaterial_core.biomaterial_id".to_string(),
    ];

    let template = TemplateDocument::from_selection(
        &["specimen_from_organism".to_string()],
        &selected,
        &snapshot.composition.tabs,
        snapshot.display_names(),
    );
    let reloaded = TemplateDocument::from_yaml(&template.to_yaml().unwrap()).unwrap();

    let mut tabs = snapshot.composition.tabs.clone();
    apply_template(&mut tabs, &reloaded);
    let specimen = tabs
        .iter()
        .find(|tab| tab.name == "specimen_from_organism")
        .unwrap();
    for path in &selected {
        assert_eq!(specimen.properties.get(path), Some(&RequiredState::PreSelected), "{}", path);
    }
    let mut paths = preselected_paths(&tabs);
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "donor_organism.biomaterial_core.biomaterial_id",
            "process.process_core.process_id",
            "specimen_from_organism.storage_method"
        ]
    );
}

#[tokio::test]
async fn promoted_sub_tabs_are_migrated_under_their_bare_title() {
    let mut contact = Sheet::new("Contact");
    contact.set_cell(LABEL_ROW, 0, "STALE");
    contact.set_cell(PROPERTY_ROW, 0, "project.contributors.name");
    contact.set_cell(FIRST_DATA_ROW, 0, "Jane Doe");
    let mut workbook = Workbook::new();
    workbook.add_sheet(contact);
    let bytes = xlsx::write_workbook(&workbook).unwrap();

    let ordering = seed::seed_ordering();
    let (migrated, report) = SchemaPipeline::new(&ordering, OntologyRequiredPolicy::Wrapper)
        .migrate_workbook(&seed::seed_registry(), &seed::seed_migrations(), &PlainLabels, bytes)
        .await
        .unwrap();

    let migrated = xlsx::read_workbook(migrated).unwrap();
    let contact = migrated.sheet("Contact").unwrap();
    assert!(contact.cell(LABEL_ROW, 0).starts_with("CONTACT NAME"));
    assert!(!report.skipped_tabs.iter().any(|name| name.contains("Contact")));
}

#[tokio::test]
async fn old_spreadsheets_are_migrated() {
    let mut donor = Sheet::new("Donor organism");
    for (column, (path, value)) in [
        ("donor_organism.biomaterial_core.biomaterial_id", "donor_1"),
        ("donor_organism.gender", "female"),
        ("donor_organism.ancestry", "European"),
        ("donor_organism.sex", "female"),
        ("process.process_core.process_location", "Cambridge"),
    ]
    .iter()
    .enumerate()
    {
        donor.set_cell(LABEL_ROW, column, "STALE");
        donor.set_cell(PROPERTY_ROW, column, *path);
        donor.set_cell(FIRST_DATA_ROW, column, *value);
    }
    let mut project = Sheet::new("Project");
    project.set_cell(PROPERTY_ROW, 0, "project.project_core.project_short_name");
    project.set_cell(FIRST_DATA_ROW, 0, "Heart atlas");
    let mut schemas = Sheet::new("Schemas");
    schemas.set_cell(1, 0, "https://schema.example.org/type/biomaterial/9.0.0/donor_organism");

    let mut workbook = Workbook::new();
    workbook.add_sheet(project);
    workbook.add_sheet(donor);
    workbook.add_sheet(schemas);
    let bytes = xlsx::write_workbook(&workbook).unwrap();

    let ordering = seed::seed_ordering();
    let (migrated, report) = SchemaPipeline::new(&ordering, OntologyRequiredPolicy::Wrapper)
        .migrate_workbook(&seed::seed_registry(), &seed::seed_migrations(), &PlainLabels, bytes)
        .await
        .unwrap();

    let migrated = xlsx::read_workbook(migrated).unwrap();
    assert_eq!(migrated.sheet_names(), vec!["Project", "Donor organism"]);

    let donor = migrated.sheet("Donor organism").unwrap();
    let paths: Vec<&str> = (0..4).map(|column| donor.property_at(column)).collect();
    assert_eq!(
        paths,
        vec![
            "donor_organism.biomaterial_core.biomaterial_id",
            "donor_organism.sex",
            "donor_organism.sex",
            "process.process_core.location"
        ]
    );
    assert_eq!(donor.cell(LABEL_ROW, 1), "BIOLOGICAL SEX (Required)");
    assert_eq!(donor.cell(FIRST_DATA_ROW, 3), "Cambridge");
    assert_eq!(donor.cell(LABEL_ROW, 3), "PROCESS LOCATION");

    let project = migrated.sheet("Project").unwrap();
    assert_eq!(project.property_at(0), "project.project_short_name");
    assert_eq!(project.cell(FIRST_DATA_ROW, 0), "Heart atlas");

    assert!(report.removed_legacy_sheet);
    assert!(report
        .columns
        .iter()
        .any(|column| column.change == ColumnChange::Removed { version: "12.0.0".to_string() }));
}

#[tokio::test]
async fn saved_histories_can_be_loaded_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"migrations": [{{"source_schema": "donor_organism", "property": "donor_organism.gender",
            "replaced_by": "donor_organism.sex", "effective_from": "6.0.0"}}]}}"#
    )
    .unwrap();

    let migrations = InMemoryMigrations::from_file(file.path().to_str().unwrap()).unwrap();
    let history = schema_template_generator::MigrationSource::fetch_history(&migrations)
        .await
        .unwrap();
    assert_eq!(history.migrations.len(), 1);
}

#[tokio::test]
async fn missing_modules_fail_the_catalog_load() {
    let broken = SchemaDocument::from_json(
        "https://schema.example.org/type/biomaterial/1.0.0/broken",
        r#"{"title": "Broken", "name": "broken",
            "properties": {"core": {"$ref": "../../../core/biomaterial/1.0.0/missing"}}}"#,
    )
    .unwrap();
    let registry = InMemoryRegistry::new().with_schema(broken);

    assert!(SchemaCatalog::load(&registry).await.is_err());
}
