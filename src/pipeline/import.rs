//! CSV → database.

use crate::db::DatabaseGateway;
use crate::error::{IngestError, IngestResult};
use crate::flatfile::{delimiter_byte, read_csv};
use crate::models::{DEFAULT_DELIMITER, ImportRequest, ImportResult};
use crate::query::{validate_identifier, validate_identifiers};
use std::path::PathBuf;
use tracing::info;

pub struct ImportPipeline<'a> {
    gateway: &'a DatabaseGateway,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(gateway: &'a DatabaseGateway) -> Self {
        Self { gateway }
    }

    /// Append the requested columns of a CSV file to a table.
    ///
    /// Every call appends; importing the same file twice duplicates its rows.
    /// The returned count is the number of rows handed to the database.
    pub async fn import(&self, request: &ImportRequest) -> IngestResult<ImportResult> {
        if !self.gateway.is_connected().await {
            return Err(IngestError::NotConnected);
        }
        if request.columns.is_empty() {
            return Err(IngestError::invalid_input("At least one column must be imported"));
        }
        validate_identifier(&request.table_name)?;
        validate_identifiers(&request.columns)?;
        let delimiter = delimiter_byte(request.delimiter.unwrap_or(DEFAULT_DELIMITER))?;

        let path = PathBuf::from(&request.file_path);
        let columns = request.columns.clone();
        let rows = tokio::task::spawn_blocking(move || {
            read_csv(&path, delimiter).and_then(|table| table.project(&columns))
        })
        .await
        .map_err(|e| IngestError::internal(format!("Import task failed: {}", e)))??;

        self.gateway
            .insert_rows(&request.table_name, &request.columns, &rows)
            .await?;

        info!(
            table = %request.table_name,
            file_path = %request.file_path,
            record_count = rows.len(),
            "Imported file"
        );
        Ok(ImportResult {
            record_count: rows.len(),
        })
    }
}
