//! Data models for the flat-file ingestion service.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod records;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DEFAULT_DATABASE, DatabaseType, normalize_host};
pub use query::{
    DEFAULT_DELIMITER, DEFAULT_PREVIEW_LIMIT, ExportRequest, ImportRequest, JoinKey, JoinKind,
    JoinSpec, MAX_PREVIEW_LIMIT, PreviewRequest,
};
pub use records::{
    ExportResult, FileColumn, FileContents, FilePreview, FileSummary, ImportResult,
    PreviewResult, Record, RecordData, UploadedFile, number_rows,
};
pub use schema::{ColumnDescriptor, TableDescriptor, TableRef};
pub use value::Value;
