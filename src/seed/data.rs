use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::model::{
    ItemsDefinition, MigrationHistory, MigrationRecord, OrderingConfig, PropertyDefinition, SchemaDocument,
};
use crate::store::catalog::SchemaCatalog;
use crate::store::memory::{InMemoryMigrations, InMemoryRegistry};

const BASE: &str = "https://schema.example.org";

const BIOMATERIAL_CORE: &str = "https://schema.example.org/core/biomaterial/8.6.1/biomaterial_core";
const PROTOCOL_CORE: &str = "https://schema.example.org/core/protocol/5.2.5/protocol_core";
const PROCESS_CORE: &str = "https://schema.example.org/core/process/2.1.0/process_core";
const SPECIES_ONTOLOGY: &str = "https://schema.example.org/module/ontology/5.3.5/species_ontology";
const ORGAN_ONTOLOGY: &str = "https://schema.example.org/module/ontology/5.3.5/organ_ontology";
const TIME_UNIT_ONTOLOGY: &str = "https://schema.example.org/module/ontology/5.3.5/time_unit_ontology";
const TIMECOURSE: &str = "https://schema.example.org/module/biomaterial/2.0.2/timecourse";
const CONTACT: &str = "https://schema.example.org/module/project/9.1.0/contact";
const FUNDER: &str = "https://schema.example.org/module/project/2.0.0/funder";

/// Helper to build a schema document with the standard bookkeeping properties
fn schema(
    url: &str,
    name: &str,
    title: &str,
    required: &[&str],
    properties: Vec<(&str, PropertyDefinition)>,
) -> SchemaDocument {
    let mut all = IndexMap::new();
    all.insert("describedBy".to_string(), field("string", None, None, None, None));
    all.insert("schema_type".to_string(), field("string", None, None, None, None));
    for (property, definition) in properties {
        all.insert(property.to_string(), definition);
    }

    SchemaDocument {
        id: Some(url.to_string()),
        title: title.to_string(),
        name: Some(name.to_string()),
        description: None,
        version: None,
        properties: all,
        required: required.iter().map(|r| r.to_string()).collect(),
    }
}

/// Helper to build a scalar property
fn field(
    value_type: &str,
    user_friendly: Option<&str>,
    description: Option<&str>,
    example: Option<Value>,
    guidelines: Option<&str>,
) -> PropertyDefinition {
    PropertyDefinition {
        value_type: Some(Value::String(value_type.to_string())),
        user_friendly: user_friendly.map(str::to_string),
        description: description.map(str::to_string),
        example,
        guidelines: guidelines.map(str::to_string),
        ..PropertyDefinition::default()
    }
}

fn reference(url: &str, user_friendly: &str, description: &str) -> PropertyDefinition {
    PropertyDefinition {
        reference: Some(url.to_string()),
        user_friendly: Some(user_friendly.to_string()),
        description: Some(description.to_string()),
        ..PropertyDefinition::default()
    }
}

fn array_of(url: &str, user_friendly: &str, description: &str, guidelines: Option<&str>) -> PropertyDefinition {
    PropertyDefinition {
        value_type: Some(Value::String("array".to_string())),
        items: Some(ItemsDefinition {
            reference: Some(url.to_string()),
            value_type: None,
        }),
        user_friendly: Some(user_friendly.to_string()),
        description: Some(description.to_string()),
        guidelines: guidelines.map(str::to_string),
        ..PropertyDefinition::default()
    }
}

fn ontology(url: &str, name: &str, title: &str, label: &str, example: &str) -> SchemaDocument {
    schema(
        url,
        name,
        title,
        &["text"],
        vec![
            (
                "text",
                field(
                    "string",
                    Some(label),
                    Some("The text for the term as the user provides it."),
                    Some(json!(example)),
                    None,
                ),
            ),
            ("ontology", field("string", Some("Ontology ID"), Some("An ontology term identifier."), None, None)),
            ("ontology_label", field("string", Some("Ontology label"), None, None, None)),
        ],
    )
}

/// Modules reachable only through `$ref`
pub fn seed_modules() -> Vec<SchemaDocument> {
    vec![
        schema(
            BIOMATERIAL_CORE,
            "biomaterial_core",
            "Biomaterial core",
            &["biomaterial_id", "ncbi_taxon_id"],
            vec![
                (
                    "biomaterial_id",
                    field(
                        "string",
                        Some("Biomaterial ID"),
                        Some("A unique ID for the biomaterial."),
                        Some(json!("donor_ABC_1")),
                        Some("ID must be unique within the project."),
                    ),
                ),
                (
                    "biomaterial_name",
                    field(
                        "string",
                        Some("Biomaterial name"),
                        Some("A short, descriptive name for the biomaterial."),
                        None,
                        None,
                    ),
                ),
                (
                    "ncbi_taxon_id",
                    field("array", Some("NCBI taxon ID"), Some("A taxonomy ID of the species."), Some(json!(9606)), None),
                ),
            ],
        ),
        schema(
            PROTOCOL_CORE,
            "protocol_core",
            "Protocol core",
            &["protocol_id"],
            vec![
                (
                    "protocol_id",
                    field("string", Some("Protocol ID"), Some("A unique ID for the protocol."), Some(json!("collection_1")), None),
                ),
                ("protocol_name", field("string", Some("Protocol name"), None, None, None)),
            ],
        ),
        schema(
            PROCESS_CORE,
            "process_core",
            "Process core",
            &["process_id"],
            vec![
                (
                    "process_id",
                    field("string", Some("Process ID"), Some("A unique ID for the process."), None, None),
                ),
                ("location", field("string", Some("Process location"), None, None, None)),
            ],
        ),
        ontology(SPECIES_ONTOLOGY, "species_ontology", "Species ontology", "Species", "Homo sapiens"),
        ontology(ORGAN_ONTOLOGY, "organ_ontology", "Organ ontology", "Organ", "heart"),
        ontology(TIME_UNIT_ONTOLOGY, "time_unit_ontology", "Time unit ontology", "Time unit", "day"),
        schema(
            TIMECOURSE,
            "timecourse",
            "Timecourse",
            &["value", "unit"],
            vec![
                ("value", field("string", Some("Timecourse value"), Some("The numerical value in Timecourse unit."), None, None)),
                ("unit", reference(TIME_UNIT_ONTOLOGY, "Timecourse unit", "The unit in which the Timecourse value is expressed.")),
            ],
        ),
        schema(
            CONTACT,
            "contact",
            "Contact",
            &["name"],
            vec![
                (
                    "name",
                    field("string", Some("Contact name"), Some("Name of individual."), Some(json!("John,D,Doe")), None),
                ),
                ("email", field("string", Some("Email address"), None, None, None)),
                ("institution", field("string", Some("Institute"), None, None, None)),
            ],
        ),
        schema(
            FUNDER,
            "funder",
            "Funder",
            &["grant_id", "organization"],
            vec![
                ("grant_id", field("string", Some("Grant ID"), None, None, None)),
                ("organization", field("string", Some("Funding organization"), None, None, None)),
            ],
        ),
    ]
}

/// Entity schemas the registry lists as latest
pub fn seed_schemas() -> Vec<SchemaDocument> {
    vec![
        schema(
            &format!("{}/type/project/14.2.0/project", BASE),
            "project",
            "Project",
            &["project_short_name", "project_title", "contributors"],
            vec![
                (
                    "project_short_name",
                    field("string", Some("Project label"), Some("A short name for the project."), Some(json!("CoolOrganProject")), None),
                ),
                ("project_title", field("string", Some("Project title"), None, None, None)),
                ("contributors", array_of(CONTACT, "Contributors", "People contributing to this project.", None)),
                ("funders", array_of(FUNDER, "Funding source(s)", "Funding source(s) supporting the project.", None)),
            ],
        ),
        schema(
            &format!("{}/type/biomaterial/15.5.0/donor_organism", BASE),
            "donor_organism",
            "Donor organism",
            &["biomaterial_core", "genus_species", "sex"],
            vec![
                ("biomaterial_core", reference(BIOMATERIAL_CORE, "Biomaterial core", "Core biomaterial-level information.")),
                (
                    "genus_species",
                    array_of(
                        SPECIES_ONTOLOGY,
                        "Genus species",
                        "The scientific binomial name for the species of the organism.",
                        Some("Enter the species name."),
                    ),
                ),
                (
                    "sex",
                    field(
                        "string",
                        Some("Biological sex"),
                        Some("The biological sex of the organism."),
                        Some(json!("female")),
                        Some("Should be one of: male, female, mixed, or unknown."),
                    ),
                ),
                ("weight", field("number", Some("Weight"), Some("Weight of the organism."), Some(json!(60)), None)),
                ("timecourse", reference(TIMECOURSE, "Timecourse", "Information relating to a timecourse.")),
            ],
        ),
        schema(
            &format!("{}/type/biomaterial/10.3.0/specimen_from_organism", BASE),
            "specimen_from_organism",
            "Specimen from organism",
            &["biomaterial_core", "organ"],
            vec![
                ("biomaterial_core", reference(BIOMATERIAL_CORE, "Biomaterial core", "Core biomaterial-level information.")),
                ("organ", reference(ORGAN_ONTOLOGY, "Organ", "The organ that the biomaterial came from.")),
                ("storage_method", field("string", Some("Storage method"), None, Some(json!("frozen")), None)),
            ],
        ),
        schema(
            &format!("{}/type/protocol/biomaterial_collection/9.2.0/collection_protocol", BASE),
            "collection_protocol",
            "Collection protocol",
            &["protocol_core"],
            vec![
                ("protocol_core", reference(PROTOCOL_CORE, "Protocol core", "Core protocol-level information.")),
                ("method", field("string", Some("Collection method"), None, Some(json!("blood draw")), None)),
            ],
        ),
        schema(
            &format!("{}/type/process/9.2.0/process", BASE),
            "process",
            "Process",
            &["process_core"],
            vec![
                ("process_core", reference(PROCESS_CORE, "Process core", "Core process-level information.")),
                (
                    "deviation_from_protocol",
                    field("string", Some("Deviation from protocol"), Some("Any deviation from the protocol."), None, None),
                ),
            ],
        ),
    ]
}

pub fn seed_catalog() -> SchemaCatalog {
    SchemaCatalog::from_documents(seed_schemas(), seed_modules())
}

pub fn seed_registry() -> InMemoryRegistry {
    let registry = seed_schemas()
        .into_iter()
        .fold(InMemoryRegistry::new(), InMemoryRegistry::with_schema);
    seed_modules()
        .into_iter()
        .fold(registry, InMemoryRegistry::with_module)
}

pub fn seed_ordering() -> OrderingConfig {
    let pairs = |entries: &[(&str, &str)]| -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    };

    OrderingConfig {
        ordering: pairs(&[
            ("project", ""),
            ("contributors", "project"),
            ("funders", "project"),
            ("donor_organism", "process"),
            ("specimen_from_organism", "process"),
            ("collection_protocol", ""),
            ("sequencing_protocol", ""),
        ]),
        biomaterial_linking: pairs(&[("specimen_from_organism", "donor_organism")]),
        protocol_linking: pairs(&[("specimen_from_organism", "collection_protocol")]),
    }
}

fn migration(property: &str, replaced_by: Option<&str>, effective_from: &str, reason: &str) -> MigrationRecord {
    MigrationRecord {
        source_schema: property.split('.').next().unwrap_or(property).to_string(),
        property: property.to_string(),
        target_schema: replaced_by.map(|path| path.split('.').next().unwrap_or(path).to_string()),
        replaced_by: replaced_by.map(str::to_string),
        effective_from: Some(effective_from.to_string()),
        reason: Some(reason.to_string()),
    }
}

pub fn seed_migrations() -> InMemoryMigrations {
    InMemoryMigrations::new(MigrationHistory::new(vec![
        migration("donor_organism.gender", Some("donor_organism.sex"), "6.0.0", "renamed"),
        migration("donor_organism.ancestry", None, "12.0.0", "removed"),
        migration(
            "project.project_core.project_short_name",
            Some("project.project_short_name"),
            "14.0.0",
            "project_core flattened into project",
        ),
        migration("process.process_core.process_location", Some("process.process_core.location"), "9.0.0", "renamed"),
    ]))
}
