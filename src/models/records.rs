//! Result models: records, export/import outcomes and file catalog entries.

use crate::models::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Column → value pairs in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordData(Vec<(String, Value)>);

impl RecordData {
    pub fn new(pairs: Vec<(String, Value)>) -> Self {
        Self(pairs)
    }

    /// Zip column names with one row of values.
    pub fn from_row(columns: &[String], row: Vec<Value>) -> Self {
        Self(columns.iter().cloned().zip(row).collect())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RecordData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One presented row. `id` is synthetic: 1-based, assigned in the order rows
/// were returned, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: usize,
    pub data: RecordData,
}

/// Assign synthetic ids 1..=N to rows in the given order.
pub fn number_rows(columns: &[String], rows: Vec<Vec<Value>>) -> Vec<Record> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| Record {
            id: idx + 1,
            data: RecordData::from_row(columns, row),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub file_path: String,
    pub record_count: usize,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResult {
    pub columns: Vec<String>,
    pub record_count: usize,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// Rows handed to the database, not a server-side committed count
    pub record_count: usize,
}

/// One catalog-managed export file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    /// 1-based position in the current listing; not stable across calls
    pub id: usize,
    pub name: String,
    pub path: String,
    pub record_count: usize,
    pub size_bytes: u64,
    /// Human-readable size, e.g. "1.5 kB"
    pub size: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContents {
    pub file_info: FileSummary,
    pub records: Vec<Record>,
}

/// Column of an uploaded flat file with its inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilePreview {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub file_path: String,
    pub row_count: usize,
    pub column_count: usize,
}
