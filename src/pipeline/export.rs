//! Database → CSV.

use crate::db::{DatabaseGateway, QueryRows};
use crate::error::{IngestError, IngestResult};
use crate::flatfile::{export_file_name, write_csv};
use crate::models::{ExportRequest, ExportResult, PreviewRequest, PreviewResult, number_rows};
use crate::query::{build_preview, build_select};
use std::path::Path;
use tracing::info;

pub struct ExportPipeline<'a> {
    gateway: &'a DatabaseGateway,
    output_dir: &'a Path,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(gateway: &'a DatabaseGateway, output_dir: &'a Path) -> Self {
        Self {
            gateway,
            output_dir,
        }
    }

    /// Run the full query, write `<table>_export.csv` and echo the records.
    ///
    /// Rows keep the order the server returned them in. If the query fails
    /// no file is written.
    pub async fn export(&self, request: &ExportRequest) -> IngestResult<ExportResult> {
        if !self.gateway.is_connected().await {
            return Err(IngestError::NotConnected);
        }

        let sql = build_select(
            &request.table_name,
            &request.columns,
            request.join_spec.as_ref(),
        )?;
        let result = self.gateway.run_query(&sql).await?;
        check_width(&result, request.columns.len())?;

        let output_dir = self.output_dir.to_path_buf();
        let path = output_dir.join(export_file_name(&request.table_name));

        let columns = request.columns.clone();
        let rows = result.rows;
        let write_path = path.clone();
        let (columns, rows) = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&output_dir).map_err(|e| {
                IngestError::export_write(output_dir.display().to_string(), e.to_string())
            })?;
            write_csv(&write_path, &columns, &rows).map(|_| (columns, rows))
        })
        .await
        .map_err(|e| IngestError::internal(format!("Export task failed: {}", e)))??;

        let records = number_rows(&columns, rows);
        let file_path = path.display().to_string();
        info!(
            table = %request.table_name,
            file_path = %file_path,
            record_count = records.len(),
            "Exported table"
        );

        Ok(ExportResult {
            file_path,
            record_count: records.len(),
            records,
        })
    }

    /// Run the capped query and return the records without writing a file.
    pub async fn preview(&self, request: &PreviewRequest) -> IngestResult<PreviewResult> {
        if !self.gateway.is_connected().await {
            return Err(IngestError::NotConnected);
        }

        let sql = build_preview(
            &request.table_name,
            &request.columns,
            request.join_spec.as_ref(),
            request.effective_limit(),
        )?;
        let result = self.gateway.run_query(&sql).await?;
        check_width(&result, request.columns.len())?;

        let records = number_rows(&request.columns, result.rows);
        info!(
            table = %request.table_name,
            record_count = records.len(),
            "Previewed table"
        );

        Ok(PreviewResult {
            columns: request.columns.clone(),
            record_count: records.len(),
            records,
        })
    }
}

/// Rows are labelled with the requested column names, so widths must agree.
fn check_width(result: &QueryRows, expected: usize) -> IngestResult<()> {
    match result.rows.iter().find(|row| row.len() != expected) {
        Some(row) => Err(IngestError::internal(format!(
            "Query returned {} values per row, expected {}",
            row.len(),
            expected
        ))),
        None => Ok(()),
    }
}
