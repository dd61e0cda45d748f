//! Request models for export, preview and import.

use serde::{Deserialize, Serialize};

/// Default row cap for previews.
pub const DEFAULT_PREVIEW_LIMIT: u32 = 100;

/// Maximum allowed preview row cap.
pub const MAX_PREVIEW_LIMIT: u32 = 10000;

/// Default CSV delimiter.
pub const DEFAULT_DELIMITER: char = ',';

/// SQL join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// SQL keyword(s) preceding `JOIN`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
        }
    }
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Key column joining two tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKey {
    pub left: String,
    pub right: String,
    pub column: String,
}

impl JoinKey {
    pub fn new(left: impl Into<String>, right: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            column: column.into(),
        }
    }

    /// True if this key joins `a` and `b`, in either orientation.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.left == a && self.right == b) || (self.left == b && self.right == a)
    }
}

/// Request to combine tables before export.
///
/// Tables are joined strictly in list order; every adjacent pair needs a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub tables: Vec<String>,
    #[serde(default)]
    pub join_type: JoinKind,
    #[serde(default)]
    pub keys: Vec<JoinKey>,
}

impl JoinSpec {
    pub fn new(tables: Vec<String>, join_type: JoinKind) -> Self {
        Self {
            tables,
            join_type,
            keys: Vec::new(),
        }
    }

    pub fn with_key(mut self, left: &str, right: &str, column: &str) -> Self {
        self.keys.push(JoinKey::new(left, right, column));
        self
    }

    /// Key column for an adjacent table pair.
    pub fn key_for(&self, left: &str, right: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|k| k.joins(left, right))
            .map(|k| k.column.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub table_name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub join_spec: Option<JoinSpec>,
}

impl ExportRequest {
    pub fn new(table_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
            join_spec: None,
        }
    }

    pub fn with_join(mut self, join_spec: JoinSpec) -> Self {
        self.join_spec = Some(join_spec);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub table_name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub join_spec: Option<JoinSpec>,
    /// Default: 100, max: 10000
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PreviewRequest {
    /// Get the effective row cap (with bounds checking).
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .map(|l| l.clamp(1, MAX_PREVIEW_LIMIT))
            .unwrap_or(DEFAULT_PREVIEW_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub table_name: String,
    pub file_path: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub delimiter: Option<char>,
}

impl ImportRequest {
    pub fn new(table_name: impl Into<String>, file_path: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table_name: table_name.into(),
            file_path: file_path.into(),
            columns,
            delimiter: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}
