use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{self, AppState};

pub fn create_router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Schema pass for the selection view
        .route("/schemas", get(handlers::list_schemas))
        // Selection -> YAML -> workbook
        .route("/template", post(handlers::generate_template))
        .route("/spreadsheet", post(handlers::build_spreadsheet))
        // Uploads
        .route("/upload", post(handlers::upload_template))
        .route("/migrate", post(handlers::migrate_spreadsheet))
        .layer(ServiceBuilder::new().layer(cors))
}
