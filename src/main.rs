use axum::serve;
use log::info;
use schema_template_generator::api::handlers::AppContext;
use schema_template_generator::api::routes::create_router;
use schema_template_generator::config::AppConfig;
use schema_template_generator::logic::metadata::label_policy;
use schema_template_generator::model::OrderingConfig;
use schema_template_generator::seed;
use schema_template_generator::store::{HttpMigrationSource, HttpSchemaRegistry, MigrationSource, SchemaRegistry};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .init();

    let config = AppConfig::load()?;
    info!(
        "Configuration loaded: server={}, registry environment={}",
        config.server_address(),
        config.registry.environment
    );

    let ordering = OrderingConfig::load(&config.tabs.config_path)?;
    info!("Loaded {} tab ordering entries from {}", ordering.ordering.len(), config.tabs.config_path);

    // Seed schemas stand in for the registry when offline
    let offline = config.registry.offline || std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true";
    let registry: Arc<dyn SchemaRegistry>;
    let migrations: Arc<dyn MigrationSource>;
    if offline {
        info!("Serving bundled seed schemas");
        registry = Arc::new(seed::seed_registry());
        migrations = Arc::new(seed::seed_migrations());
    } else {
        registry = Arc::new(HttpSchemaRegistry::new(&config.registry)?);
        migrations = Arc::new(HttpMigrationSource::new(&config.registry)?);
    }

    let state = Arc::new(AppContext::new(
        registry,
        migrations,
        ordering,
        config.policy.ontology_required,
        label_policy(&config.policy.labels),
    ));

    run_server(create_router().with_state(state), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    info!("Template generator running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
