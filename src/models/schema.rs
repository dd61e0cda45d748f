//! Schema-related data models.
//!
//! Produced by catalog introspection; read-only and never persisted.

use crate::error::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};

/// One discovered table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Qualified name: `database.table`
    pub name: String,
    /// Storage engine label (e.g. "MergeTree", "SQLite")
    pub engine: String,
    /// Approximate row count. None when the engine does not report one (views).
    pub row_count: Option<u64>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, engine: impl Into<String>, row_count: Option<u64>) -> Self {
        Self {
            name: name.into(),
            engine: engine.into(),
            row_count,
        }
    }
}

/// One column of a table, in physical position order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type string as reported by the database
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_expression: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default_kind: None,
            default_expression: None,
        }
    }

    /// Attach a default. Empty strings are treated as "no default".
    pub fn with_default(mut self, kind: Option<String>, expression: Option<String>) -> Self {
        self.default_kind = kind.filter(|k| !k.is_empty());
        self.default_expression = expression.filter(|e| !e.is_empty());
        self
    }
}

/// A table reference split into its optional database and table parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub database: Option<String>,
    pub table: String,
}

impl TableRef {
    /// Split a bare `table` or qualified `database.table` name.
    ///
    /// A dotted name must split into exactly two non-empty parts.
    pub fn parse(name: &str) -> IngestResult<Self> {
        if !name.contains('.') {
            if name.is_empty() {
                return Err(IngestError::invalid_table_name(name));
            }
            return Ok(Self {
                database: None,
                table: name.to_string(),
            });
        }

        let parts: Vec<&str> = name.split('.').collect();
        match parts.as_slice() {
            [database, table] if !database.is_empty() && !table.is_empty() => Ok(Self {
                database: Some(database.to_string()),
                table: table.to_string(),
            }),
            _ => Err(IngestError::invalid_table_name(name)),
        }
    }
}
