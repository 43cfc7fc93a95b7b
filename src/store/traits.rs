use crate::error::Result;
use crate::model::{MigrationHistory, SchemaDocument};

/// Source of published schema documents
#[async_trait::async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Urls of the latest version of every entity schema
    async fn latest_schema_urls(&self) -> Result<Vec<String>>;
    /// Fetch and parse one schema document
    async fn fetch_schema(&self, url: &str) -> Result<SchemaDocument>;
}

/// Source of property rename/removal history
#[async_trait::async_trait]
pub trait MigrationSource: Send + Sync {
    async fn fetch_history(&self) -> Result<MigrationHistory>;
}

/// Resolves a `$ref` url to an already loaded document
pub trait SchemaResolver {
    fn resolve(&self, reference: &str) -> Result<&SchemaDocument>;
}
