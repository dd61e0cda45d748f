//! HTTP API.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET | `/` | service status |
//! | POST | `/connect` | connect, returns tables |
//! | GET | `/tables` | list tables |
//! | GET | `/tables/{name}/columns` | list columns |
//! | POST | `/export` | query → CSV file |
//! | POST | `/preview` | capped query, no file |
//! | POST | `/import` | CSV file → table |
//! | GET | `/files` | list export files |
//! | GET | `/files/{id}` | one export file with records |
//! | POST | `/flatfile/upload` | store a CSV upload |
//! | GET | `/flatfile/columns/{filename}` | inferred columns of an upload |
//! | GET | `/flatfile/preview/{filename}` | first rows of an upload |

pub mod handlers;

use crate::db::DatabaseGateway;
use crate::pipeline::FileCatalog;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: DatabaseGateway,
    pub catalog: FileCatalog,
    pub max_upload_size: usize,
}

impl AppState {
    pub fn new(gateway: DatabaseGateway, catalog: FileCatalog, max_upload_size: usize) -> Self {
        Self {
            gateway,
            catalog,
            max_upload_size,
        }
    }
}

/// Build the router with request tracing.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_size);

    Router::new()
        .route("/", get(handlers::root))
        .route("/connect", post(handlers::connect))
        .route("/tables", get(handlers::list_tables))
        .route("/tables/{name}/columns", get(handlers::list_columns))
        .route("/export", post(handlers::export))
        .route("/preview", post(handlers::preview))
        .route("/import", post(handlers::import))
        .route("/files", get(handlers::list_files))
        .route("/files/{id}", get(handlers::read_file))
        .route(
            "/flatfile/upload",
            post(handlers::upload).layer(upload_limit),
        )
        .route("/flatfile/columns/{filename}", get(handlers::file_columns))
        .route("/flatfile/preview/{filename}", get(handlers::preview_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
