use serde::{Deserialize, Serialize};

use crate::model::OntologyRequiredPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub tabs: TabsConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where schemas and their migration history are published.
///
/// Urls may contain `{env}`, replaced by `environment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub environment: String,
    pub latest_schemas_url: String,
    pub schema_base_url: String,
    pub migrations_url: String,
    pub timeout_secs: u64,
    /// Serve the bundled seed schemas instead of the remote registry
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabsConfig {
    /// Ordering and linking declarations, `tabs_config.toml` by default
    pub config_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub ontology_required: OntologyRequiredPolicy,
    /// `entity` or `plain`
    pub labels: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            latest_schemas_url: "http://api.ingest.{env}.data.humancellatlas.org/schemas/search/latestSchemas"
                .to_string(),
            schema_base_url: "http://schema.{env}.data.humancellatlas.org/".to_string(),
            migrations_url: "http://schema.{env}.data.humancellatlas.org/property_migrations".to_string(),
            timeout_secs: 30,
            offline: false,
        }
    }
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            config_path: "tabs_config.toml".to_string(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ontology_required: OntologyRequiredPolicy::default(),
            labels: "entity".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn latest_schemas_url(&self) -> String {
        self.with_environment(&self.latest_schemas_url)
    }

    pub fn schema_base_url(&self) -> String {
        self.with_environment(&self.schema_base_url)
    }

    pub fn migrations_url(&self) -> String {
        self.with_environment(&self.migrations_url)
    }

    fn with_environment(&self, url: &str) -> String {
        url.replace("{env}", &self.environment)
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and `TEMPLATE_*`
    /// environment variables, in increasing precedence
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // TEMPLATE_REGISTRY__ENVIRONMENT=staging
        config = config.add_source(
            config::Environment::with_prefix("TEMPLATE")
                .prefix_separator("_")
                .separator("__"),
        );

        let app_config: AppConfig = config.build()?.try_deserialize()?;
        Ok(app_config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_urls_fill_in_the_environment() {
        let registry = RegistryConfig {
            environment: "staging".to_string(),
            ..RegistryConfig::default()
        };
        assert_eq!(
            registry.latest_schemas_url(),
            "http://api.ingest.staging.data.humancellatlas.org/schemas/search/latestSchemas"
        );
        assert_eq!(registry.schema_base_url(), "http://schema.staging.data.humancellatlas.org/");
    }

    #[test]
    fn defaults_survive_the_config_layers() {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.tabs.config_path, "tabs_config.toml");
        assert_eq!(config.policy.ontology_required, OntologyRequiredPolicy::Wrapper);
    }
}
