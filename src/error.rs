//! Error types for the flat-file ingestion service.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant maps to one HTTP status and, where the caller can fix the problem,
//! carries an actionable suggestion.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Not connected to a database")]
    NotConnected,

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Invalid identifier '{identifier}': only letters, digits, '_' and '.' are allowed")]
    InvalidIdentifier { identifier: String },

    #[error("A join needs at least 2 tables, got {count}")]
    InsufficientTables { count: usize },

    #[error("No join key for tables '{left}' and '{right}'")]
    MissingJoinKey { left: String, right: String },

    #[error("Invalid table name '{name}': expected 'table' or 'database.table'")]
    InvalidTableName { name: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Insert into '{table}' failed: {message}")]
    Insert { table: String, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Column '{column}' not found in file header")]
    ColumnNotFound { column: String },

    #[error("Failed to write export file '{path}': {message}")]
    ExportWrite { path: String, message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl IngestError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn invalid_identifier(identifier: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
        }
    }

    pub fn insufficient_tables(count: usize) -> Self {
        Self::InsufficientTables { count }
    }

    pub fn missing_join_key(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::MissingJoinKey {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn invalid_table_name(name: impl Into<String>) -> Self {
        Self::InvalidTableName { name: name.into() }
    }

    /// Create a query error carrying the underlying client message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn insert(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Insert {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    pub fn export_write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExportWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Machine-readable error code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "NOT_CONNECTED",
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            Self::InsufficientTables { .. } => "INSUFFICIENT_TABLES",
            Self::MissingJoinKey { .. } => "MISSING_JOIN_KEY",
            Self::InvalidTableName { .. } => "INVALID_TABLE_NAME",
            Self::Query { .. } => "QUERY_ERROR",
            Self::Insert { .. } => "INSERT_ERROR",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::ExportWrite { .. } => "EXPORT_WRITE_ERROR",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotConnected => Some("Call POST /connect first"),
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::InsufficientTables { .. } => {
                Some("List at least two tables in join_spec.tables, or omit join_spec")
            }
            Self::MissingJoinKey { .. } => {
                Some("Add a join_spec.keys entry for every adjacent pair of tables")
            }
            Self::ColumnNotFound { .. } => Some("Check the column names against the file header"),
            _ => None,
        }
    }

    /// HTTP status for this error: caller mistakes are 400, unknown files 404,
    /// database and transport failures 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConnected
            | Self::InvalidIdentifier { .. }
            | Self::InsufficientTables { .. }
            | Self::MissingJoinKey { .. }
            | Self::InvalidTableName { .. }
            | Self::ColumnNotFound { .. }
            | Self::Parse { .. }
            | Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Connection { .. }
            | Self::Query { .. }
            | Self::Insert { .. }
            | Self::ExportWrite { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
                suggestion: self.suggestion(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = IngestError::connection("refused", "Check that ClickHouse is running");
        assert_eq!(err.suggestion(), Some("Check that ClickHouse is running"));
        assert!(IngestError::query("boom").suggestion().is_none());
    }

    #[test]
    fn test_caller_errors_map_to_bad_request() {
        assert_eq!(IngestError::NotConnected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            IngestError::missing_join_key("a", "b").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IngestError::insufficient_tables(1).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IngestError::invalid_identifier("a;b").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IngestError::column_not_found("z").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_file_not_found_maps_to_not_found() {
        assert_eq!(
            IngestError::file_not_found("uploads/x.csv").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_backend_errors_map_to_internal_error() {
        assert_eq!(
            IngestError::query("syntax").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            IngestError::insert("t", "type mismatch").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            IngestError::export_write("out.csv", "disk full").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            IngestError::connection("refused", "retry").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(IngestError::NotConnected.code(), "NOT_CONNECTED");
        assert_eq!(IngestError::invalid_table_name("a.b.c").code(), "INVALID_TABLE_NAME");
        assert_eq!(IngestError::parse("f.csv", "bad").code(), "PARSE_ERROR");
    }
}
