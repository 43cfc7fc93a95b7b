use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Json as RequestJson,
};
use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::TemplateError;
use crate::logic::export::{apply_template, WorkbookBuilder};
use crate::logic::compose::Composition;
use crate::logic::metadata::LabelPolicy;
use crate::logic::pipeline::{SchemaPipeline, SchemaSnapshot};
use crate::model::{OntologyRequiredPolicy, OrderingConfig, Structure, Tab, TemplateDocument};
use crate::store::traits::{MigrationSource, SchemaRegistry};
use crate::store::xlsx;

pub const YAML_CONTENT_TYPE: &str = "application/x-yaml";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Shared state of the template service
pub struct AppContext {
    pub registry: Arc<dyn SchemaRegistry>,
    pub migrations: Arc<dyn MigrationSource>,
    pub ordering: OrderingConfig,
    pub policy: OntologyRequiredPolicy,
    pub labels: Box<dyn LabelPolicy>,
    /// Tabs and titles from the latest schema pass, swapped wholesale after each pass
    pub composition: RwLock<Composition>,
}

pub type AppState = Arc<AppContext>;

impl AppContext {
    pub fn new(
        registry: Arc<dyn SchemaRegistry>,
        migrations: Arc<dyn MigrationSource>,
        ordering: OrderingConfig,
        policy: OntologyRequiredPolicy,
        labels: Box<dyn LabelPolicy>,
    ) -> Self {
        Self {
            registry,
            migrations,
            ordering,
            policy,
            labels,
            composition: RwLock::new(Composition::default()),
        }
    }

    fn pipeline(&self) -> SchemaPipeline<'_> {
        SchemaPipeline::new(&self.ordering, self.policy)
    }

    /// Run a schema pass and publish its composition
    async fn refresh(&self) -> Result<SchemaSnapshot, TemplateError> {
        let snapshot = self.pipeline().run(self.registry.as_ref()).await?;
        *self.composition.write() = snapshot.composition.clone();
        Ok(snapshot)
    }

    /// The latest composition, running a first pass when none has happened yet
    async fn composition(&self) -> Result<Composition, TemplateError> {
        let current = self.composition.read().clone();
        if !current.display_names.is_empty() {
            return Ok(current);
        }
        Ok(self.refresh().await?.composition)
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

fn error_response(err: TemplateError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        e if e.is_user_error() => StatusCode::BAD_REQUEST,
        TemplateError::Fetch { .. } | TemplateError::MalformedSchema { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Request failed with {}: {}", status, err);
    (status, Json(ErrorResponse::new(&err.to_string())))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Tabs and module structures offered for selection
#[derive(Debug, Serialize)]
pub struct SchemasResponse {
    pub tabs: Vec<Tab>,
    pub modules: Vec<Structure>,
}

impl From<SchemaSnapshot> for SchemasResponse {
    fn from(snapshot: SchemaSnapshot) -> Self {
        Self {
            tabs: snapshot.composition.tabs,
            modules: snapshot.structures,
        }
    }
}

pub async fn list_schemas(State(state): State<AppState>) -> ApiResult<Json<SchemasResponse>> {
    let snapshot = state.refresh().await.map_err(error_response)?;
    Ok(Json(snapshot.into()))
}

/// Schemas and properties ticked in the selection view
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
}

pub async fn generate_template(
    State(state): State<AppState>,
    RequestJson(selection): RequestJson<SelectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let composition = state.composition().await.map_err(error_response)?;
    let template = TemplateDocument::from_selection(
        &selection.schemas,
        &selection.properties,
        &composition.tabs,
        &composition.display_names,
    );
    let yaml = template.to_yaml().map_err(error_response)?;

    info!("Generated template with {} tabs", template.tabs.len());
    Ok(([(header::CONTENT_TYPE, YAML_CONTENT_TYPE)], yaml))
}

pub async fn build_spreadsheet(State(state): State<AppState>, body: String) -> ApiResult<impl IntoResponse> {
    let template = TemplateDocument::from_yaml(&body).map_err(error_response)?;
    let snapshot = state.refresh().await.map_err(error_response)?;

    let builder = WorkbookBuilder::new(
        snapshot.metadata(state.policy),
        state.labels.as_ref(),
        snapshot.display_names(),
    );
    let workbook = builder.from_template(&template);
    let bytes = xlsx::write_workbook(&workbook).map_err(error_response)?;

    Ok(xlsx_attachment("template.xlsx", bytes))
}

pub async fn upload_template(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<SchemasResponse>> {
    let (file_name, bytes) = read_upload(multipart, &[".yaml", ".yml"]).await?;
    let content = String::from_utf8(bytes)
        .map_err(|_| error_response(TemplateError::MalformedUpload(format!("{} is not UTF-8 text", file_name))))?;
    let template = TemplateDocument::from_yaml(&content).map_err(error_response)?;

    let snapshot = state.refresh().await.map_err(error_response)?;
    let mut response = SchemasResponse::from(snapshot);
    apply_template(&mut response.tabs, &template);

    info!("Applied uploaded template {}", file_name);
    Ok(Json(response))
}

pub async fn migrate_spreadsheet(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (file_name, bytes) = read_upload(multipart, &[".xlsx"]).await?;

    let (migrated, report) = state
        .pipeline()
        .migrate_workbook(
            state.registry.as_ref(),
            state.migrations.as_ref(),
            state.labels.as_ref(),
            bytes,
        )
        .await
        .map_err(error_response)?;

    info!(
        "Migrated {}: {} columns checked, {} tabs skipped",
        file_name,
        report.columns.len(),
        report.skipped_tabs.len()
    );
    Ok(xlsx_attachment(&file_name, migrated))
}

/// First uploaded file of the form, rejected unless its name has one of `extensions`
async fn read_upload(mut multipart: Multipart, extensions: &[&str]) -> ApiResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(TemplateError::MalformedUpload(format!("invalid multipart field: {}", e))))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let lower = file_name.to_lowercase();
        if !extensions.iter().any(|extension| lower.ends_with(extension)) {
            return Err(error_response(TemplateError::UnsupportedFile(file_name)));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| error_response(TemplateError::MalformedUpload(format!("failed to read {}: {}", file_name, e))))?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(error_response(TemplateError::MalformedUpload("no file was uploaded".to_string())))
}

fn xlsx_attachment(file_name: &str, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
            ),
        ],
        bytes,
    )
}
