use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::error::{Result, TemplateError};
use crate::model::{MigrationHistory, SchemaDocument};
use crate::store::traits::{MigrationSource, SchemaRegistry};

/// One page of the registry's latest-schemas collection
#[derive(Debug, Deserialize)]
struct SchemaPage {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedSchemas>,
    #[serde(rename = "_links", default)]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedSchemas {
    #[serde(default)]
    schemas: Vec<SchemaDescriptor>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

/// Registry entry describing where a schema is published
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescriptor {
    #[serde(default)]
    pub high_level_entity: Option<String>,
    #[serde(default)]
    pub domain_entity: Option<String>,
    #[serde(default)]
    pub sub_domain_entity: Option<String>,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub concrete_entity: Option<String>,
}

/// Entity schemas live under the `type` high-level entity
const ENTITY_TYPE: &str = "type";

impl SchemaDescriptor {
    /// `<base>/<highLevelEntity>/<domainEntity>[/<subDomainEntity>]/<schemaVersion>/<concreteEntity>`,
    /// or `None` for descriptors that are not entity schemas or describe analyses
    pub fn document_url(&self, base_url: &str) -> Option<String> {
        if self.high_level_entity.as_deref() != Some(ENTITY_TYPE) {
            return None;
        }
        let concrete = self.concrete_entity.as_deref()?;
        if concrete.contains("analysis_") {
            return None;
        }

        let segments = [
            self.high_level_entity.as_deref(),
            self.domain_entity.as_deref(),
            self.sub_domain_entity.as_deref(),
            self.schema_version.as_deref(),
            Some(concrete),
        ];
        let mut url = base_url.trim_end_matches('/').to_string();
        for segment in segments.into_iter().flatten().filter(|s| !s.is_empty()) {
            url.push('/');
            url.push_str(segment);
        }
        Some(url)
    }
}

pub struct HttpSchemaRegistry {
    client: Client,
    latest_schemas_url: String,
    schema_base_url: String,
}

impl HttpSchemaRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            latest_schemas_url: config.latest_schemas_url(),
            schema_base_url: config.schema_base_url(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        get_text(&self.client, url).await
    }
}

#[async_trait::async_trait]
impl SchemaRegistry for HttpSchemaRegistry {
    async fn latest_schema_urls(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        let mut next = Some(self.latest_schemas_url.clone());

        while let Some(page_url) = next.take() {
            debug!("Fetching schema catalog page {}", page_url);
            let body = self.get_text(&page_url).await?;
            let page: SchemaPage =
                serde_json::from_str(&body).map_err(|e| TemplateError::fetch(&page_url, e))?;

            if let Some(embedded) = page.embedded {
                urls.extend(
                    embedded
                        .schemas
                        .iter()
                        .filter_map(|descriptor| descriptor.document_url(&self.schema_base_url)),
                );
            }
            next = page.links.and_then(|links| links.next).map(|link| link.href);
        }

        info!("Schema registry lists {} entity schemas", urls.len());
        Ok(urls)
    }

    async fn fetch_schema(&self, url: &str) -> Result<SchemaDocument> {
        let body = self.get_text(url).await?;
        SchemaDocument::from_json(url, &body).map_err(|e| TemplateError::malformed_schema(url, e))
    }
}

pub struct HttpMigrationSource {
    client: Client,
    migrations_url: String,
}

impl HttpMigrationSource {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            migrations_url: config.migrations_url(),
        })
    }
}

#[async_trait::async_trait]
impl MigrationSource for HttpMigrationSource {
    async fn fetch_history(&self) -> Result<MigrationHistory> {
        let body = get_text(&self.client, &self.migrations_url).await?;
        serde_json::from_str(&body).map_err(|e| TemplateError::fetch(&self.migrations_url, e))
    }
}

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TemplateError::Config(format!("failed to build HTTP client: {}", e)))
}

async fn get_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| TemplateError::fetch(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TemplateError::fetch(url, format!("status {}", status)));
    }
    response.text().await.map_err(|e| TemplateError::fetch(url, e))
}
