//! Database type mappings.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies a declared column type into a logical category
//! 2. Backend-specific decoders turn the raw cell into a [`Value`]
//!
//! ClickHouse cells arrive as JSON (64-bit integers quoted as strings);
//! SQLite cells arrive as sqlx rows with a runtime storage class.

use crate::models::Value;
use crate::models::value::DATETIME_FORMAT;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    UnsignedInteger,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Text,
    Binary,
    Unknown,
}

/// Strip `Nullable(...)` and `LowCardinality(...)` wrappers, in any nesting.
pub fn unwrap_type_modifiers(type_name: &str) -> &str {
    let mut current = type_name.trim();
    loop {
        let inner = ["Nullable(", "LowCardinality("].iter().find_map(|prefix| {
            current
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(')'))
        });
        match inner {
            Some(inner) => current = inner.trim(),
            None => return current,
        }
    }
}

/// Classify a ClickHouse type name.
pub fn categorize_clickhouse_type(type_name: &str) -> TypeCategory {
    let base = unwrap_type_modifiers(type_name);
    let head = base.split('(').next().unwrap_or(base);

    match head {
        "Int8" | "Int16" | "Int32" | "Int64" => TypeCategory::Integer,
        "UInt8" | "UInt16" | "UInt32" | "UInt64" => TypeCategory::UnsignedInteger,
        "Float32" | "Float64" => TypeCategory::Float,
        "Bool" | "Boolean" => TypeCategory::Boolean,
        "Date" | "Date32" => TypeCategory::Date,
        "DateTime" | "DateTime64" => TypeCategory::DateTime,
        "String" | "FixedString" | "UUID" | "Enum8" | "Enum16" | "IPv4" | "IPv6" => {
            TypeCategory::Text
        }
        _ if head.starts_with("Decimal") => TypeCategory::Decimal,
        _ => TypeCategory::Unknown,
    }
}

/// Classify a SQLite declared column type.
///
/// Only the categories that need a dedicated decode are distinguished; the
/// rest follow the cell's runtime storage class.
pub fn categorize_sqlite_type(type_name: &str) -> TypeCategory {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" | "BOOL" => TypeCategory::Boolean,
        "DATE" => TypeCategory::Date,
        "DATETIME" | "TIMESTAMP" => TypeCategory::DateTime,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// ClickHouse Decoding
// =============================================================================

/// Convert one JSON cell from a ClickHouse result into a [`Value`] using the
/// column's declared type.
///
/// Cells that do not match their declared type are kept as text rather than
/// dropped.
pub fn decode_clickhouse_value(raw: &JsonValue, type_name: &str) -> Value {
    if raw.is_null() {
        return Value::Null;
    }

    let decoded = match categorize_clickhouse_type(type_name) {
        TypeCategory::Integer => json_i64(raw).map(Value::Int),
        TypeCategory::UnsignedInteger => json_u64(raw).map(Value::UInt),
        TypeCategory::Float => json_f64(raw).map(Value::Float),
        // Kept as the server's digits; Decimal(38, s) does not fit an f64
        TypeCategory::Decimal => Some(json_as_text(raw)),
        TypeCategory::Boolean => match raw {
            JsonValue::Bool(v) => Some(Value::Bool(*v)),
            JsonValue::Number(n) => n.as_u64().map(|v| Value::Bool(v != 0)),
            _ => None,
        },
        TypeCategory::Date => raw
            .as_str()
            .and_then(parse_date)
            .map(Value::Date),
        TypeCategory::DateTime => raw
            .as_str()
            .and_then(parse_datetime)
            .map(Value::DateTime),
        _ => None,
    };

    decoded.unwrap_or_else(|| json_as_text(raw))
}

fn json_i64(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_u64(raw: &JsonValue) -> Option<u64> {
    match raw {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_f64(raw: &JsonValue) -> Option<f64> {
    match raw {
        JsonValue::Number(n) => n.as_f64(),
        // Non-finite floats are quoted
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_as_text(raw: &JsonValue) -> Value {
    match raw {
        JsonValue::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse `YYYY-MM-DD HH:MM:SS[.fff]`, also accepting a `T` separator.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

// =============================================================================
// SQLite Decoding
// =============================================================================

pub mod sqlite {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column, Row, TypeInfo, ValueRef};
    use tracing::warn;

    /// Decode every column of a row, in column order.
    pub fn decode_row(row: &SqliteRow) -> Vec<Value> {
        (0..row.columns().len())
            .map(|idx| decode_column(row, idx))
            .collect()
    }

    /// Column names of a row, in column order.
    pub fn column_names(row: &SqliteRow) -> Vec<String> {
        row.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn decode_column(row: &SqliteRow, idx: usize) -> Value {
        let storage_class = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Ok(raw) => raw.type_info().name().to_string(),
            Err(e) => {
                warn!(column = idx, error = %e, "Failed to read SQLite cell");
                return Value::Null;
            }
        };

        let declared = row.column(idx).type_info().name();
        let typed = match categorize_sqlite_type(declared) {
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(Value::Bool),
            TypeCategory::Date => row.try_get::<NaiveDate, _>(idx).ok().map(Value::Date),
            TypeCategory::DateTime => row
                .try_get::<NaiveDateTime, _>(idx)
                .ok()
                .map(Value::DateTime),
            _ => None,
        };
        if let Some(value) = typed {
            return value;
        }

        decode_by_storage_class(row, idx, &storage_class)
    }

    fn decode_by_storage_class(row: &SqliteRow, idx: usize, storage_class: &str) -> Value {
        let decoded = match storage_class {
            "INTEGER" => row.try_get::<i64, _>(idx).ok().map(Value::Int),
            "REAL" => row.try_get::<f64, _>(idx).ok().map(Value::Float),
            "BLOB" => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|bytes| Value::Text(STANDARD.encode(bytes))),
            _ => row.try_get::<String, _>(idx).ok().map(Value::Text),
        };
        decoded.unwrap_or_else(|| {
            warn!(column = idx, storage_class, "Unsupported SQLite cell, returning NULL");
            Value::Null
        })
    }
}
