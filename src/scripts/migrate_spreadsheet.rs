use anyhow::{bail, Context, Result};
use schema_template_generator::config::AppConfig;
use schema_template_generator::logic::metadata::label_policy;
use schema_template_generator::logic::migrate::ColumnChange;
use schema_template_generator::logic::pipeline::SchemaPipeline;
use schema_template_generator::model::OrderingConfig;
use schema_template_generator::store::{HttpMigrationSource, HttpSchemaRegistry, InMemoryMigrations, MigrationSource};

/// Migrate a previously exported spreadsheet from the command line.
///
/// Usage: migrate-spreadsheet <input.xlsx> <output.xlsx> [migrations.json]
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, output) = match args.as_slice() {
        [input, output, ..] => (input, output),
        _ => bail!("usage: migrate-spreadsheet <input.xlsx> <output.xlsx> [migrations.json]"),
    };

    let config = AppConfig::load()?;
    let ordering = OrderingConfig::load(&config.tabs.config_path)
        .with_context(|| format!("failed to read tab config {}", config.tabs.config_path))?;
    let registry = HttpSchemaRegistry::new(&config.registry)?;
    // A saved history file skips the migration service
    let migrations: Box<dyn MigrationSource> = match args.get(2) {
        Some(path) => Box::new(InMemoryMigrations::from_file(path)?),
        None => Box::new(HttpMigrationSource::new(&config.registry)?),
    };

    let bytes = std::fs::read(input).with_context(|| format!("failed to read {}", input))?;
    println!("Migrating {} against the {} registry...", input, config.registry.environment);

    let labels = label_policy(&config.policy.labels);
    let pipeline = SchemaPipeline::new(&ordering, config.policy.ontology_required);
    let (migrated, report) = pipeline
        .migrate_workbook(&registry, migrations.as_ref(), labels.as_ref(), bytes)
        .await?;

    std::fs::write(output, migrated).with_context(|| format!("failed to write {}", output))?;

    for column in &report.columns {
        match &column.change {
            ColumnChange::Renamed { to } => println!("  {}: {} -> {}", column.tab, column.property, to),
            ColumnChange::Removed { version } => {
                println!("  {}: {} removed (since {})", column.tab, column.property, version)
            }
            ColumnChange::Unknown => println!("  {}: {} not recognised, left as is", column.tab, column.property),
            ColumnChange::Current => {}
        }
    }
    for tab in &report.skipped_tabs {
        println!("  skipped tab {}", tab);
    }
    println!("Migration completed! Written to {}", output);

    Ok(())
}
