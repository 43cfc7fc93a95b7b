pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export error types
pub use error::{Result, TemplateError};

// Export logic types
pub use logic::{
    apply_template, extract_references, flatten, flatten_catalog, resolve_identity, Composition, EntityLabels,
    LabelPolicy, MetadataLookup, MigrationReport, PlainLabels, SchemaPipeline, SchemaSnapshot, SpreadsheetMigrator,
    TabComposer, WorkbookBuilder,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{InMemoryMigrations, InMemoryRegistry, MigrationSource, SchemaCatalog, SchemaRegistry};
