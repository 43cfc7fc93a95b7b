use std::collections::HashMap;

use crate::error::{Result, TemplateError};
use crate::model::{MigrationHistory, SchemaDocument};
use crate::store::traits::{MigrationSource, SchemaRegistry};

/// Registry serving documents held in memory, used for seed data and offline runs
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    latest: Vec<String>,
    documents: HashMap<String, SchemaDocument>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity schema listed as latest; documents must carry an `$id`
    pub fn with_schema(mut self, document: SchemaDocument) -> Self {
        let url = document_url(&document);
        self.latest.push(url.clone());
        self.documents.insert(url, document);
        self
    }

    /// Register a module only reachable through `$ref`
    pub fn with_module(mut self, document: SchemaDocument) -> Self {
        self.documents.insert(document_url(&document), document);
        self
    }
}

#[async_trait::async_trait]
impl SchemaRegistry for InMemoryRegistry {
    async fn latest_schema_urls(&self) -> Result<Vec<String>> {
        Ok(self.latest.clone())
    }

    async fn fetch_schema(&self, url: &str) -> Result<SchemaDocument> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| TemplateError::fetch(url, "no such schema"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMigrations {
    history: MigrationHistory,
}

impl InMemoryMigrations {
    pub fn new(history: MigrationHistory) -> Self {
        Self { history }
    }

    /// Read a migration history saved from the migration service
    pub fn from_file(path: &str) -> Result<Self> {
        let body = std::fs::read_to_string(path).map_err(|e| TemplateError::fetch(path, e))?;
        let history = serde_json::from_str(&body).map_err(|e| TemplateError::fetch(path, e))?;
        Ok(Self { history })
    }
}

#[async_trait::async_trait]
impl MigrationSource for InMemoryMigrations {
    async fn fetch_history(&self) -> Result<MigrationHistory> {
        Ok(self.history.clone())
    }
}

fn document_url(document: &SchemaDocument) -> String {
    document
        .url()
        .map(str::to_string)
        .unwrap_or_else(|| document.name().to_string())
}
