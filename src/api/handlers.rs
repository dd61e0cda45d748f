//! Request handlers.
//!
//! Each handler is a thin adapter: extract, call the gateway or a pipeline,
//! wrap the result in JSON. Errors render through `IngestError`'s
//! `IntoResponse`.

use crate::api::AppState;
use crate::error::{IngestError, IngestResult};
use crate::models::{
    ColumnDescriptor, ConnectionConfig, DEFAULT_PREVIEW_LIMIT, ExportRequest, ExportResult,
    FileColumn, FileContents, FilePreview, FileSummary, ImportRequest, ImportResult,
    MAX_PREVIEW_LIMIT, PreviewRequest, PreviewResult, TableDescriptor, UploadedFile,
};
use crate::pipeline::{ExportPipeline, ImportPipeline};
use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use serde::{Deserialize, Serialize};

/// Name of the multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub connected: bool,
}

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        connected: state.gateway.is_connected().await,
    })
}

pub async fn connect(
    State(state): State<AppState>,
    Json(config): Json<ConnectionConfig>,
) -> IngestResult<Json<Vec<TableDescriptor>>> {
    Ok(Json(state.gateway.connect(config).await?))
}

pub async fn list_tables(State(state): State<AppState>) -> IngestResult<Json<Vec<TableDescriptor>>> {
    Ok(Json(state.gateway.list_tables().await?))
}

pub async fn list_columns(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> IngestResult<Json<Vec<ColumnDescriptor>>> {
    Ok(Json(state.gateway.list_columns(&name).await?))
}

pub async fn export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> IngestResult<Json<ExportResult>> {
    let pipeline = ExportPipeline::new(&state.gateway, state.catalog.dir());
    Ok(Json(pipeline.export(&request).await?))
}

pub async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> IngestResult<Json<PreviewResult>> {
    let pipeline = ExportPipeline::new(&state.gateway, state.catalog.dir());
    Ok(Json(pipeline.preview(&request).await?))
}

pub async fn import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> IngestResult<Json<ImportResult>> {
    let pipeline = ImportPipeline::new(&state.gateway);
    Ok(Json(pipeline.import(&request).await?))
}

pub async fn list_files(State(state): State<AppState>) -> IngestResult<Json<Vec<FileSummary>>> {
    Ok(Json(state.catalog.list_files().await?))
}

pub async fn read_file(
    State(state): State<AppState>,
    Path(id): Path<usize>,
) -> IngestResult<Json<FileContents>> {
    Ok(Json(state.catalog.read_file(id).await?))
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> IngestResult<Json<UploadedFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::invalid_input(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| IngestError::invalid_input("Upload is missing a file name"))?;
        let contents = field
            .bytes()
            .await
            .map_err(|e| IngestError::invalid_input(format!("Failed to read upload: {}", e)))?;
        return Ok(Json(state.catalog.upload(&filename, contents.to_vec()).await?));
    }
    Err(IngestError::invalid_input(format!(
        "Multipart field '{}' is required",
        UPLOAD_FIELD
    )))
}

pub async fn file_columns(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> IngestResult<Json<Vec<FileColumn>>> {
    Ok(Json(state.catalog.file_columns(&filename).await?))
}

#[derive(Debug, Deserialize)]
pub struct FilePreviewParams {
    pub limit: Option<u32>,
}

pub async fn preview_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(params): Query<FilePreviewParams>,
) -> IngestResult<Json<FilePreview>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PREVIEW_LIMIT)
        .clamp(1, MAX_PREVIEW_LIMIT) as usize;
    Ok(Json(state.catalog.preview_file(&filename, limit).await?))
}
