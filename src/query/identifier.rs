//! Identifier whitelisting.
//!
//! Table and column names are interpolated into SQL, not bound as parameters,
//! so anything outside `[A-Za-z0-9_.]` is rejected before it reaches a query.

use crate::error::{IngestError, IngestResult};

/// True if `c` may appear in an interpolated identifier.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Check a single identifier.
pub fn validate_identifier(name: &str) -> IngestResult<&str> {
    if name.is_empty() || !name.chars().all(is_identifier_char) {
        return Err(IngestError::invalid_identifier(name));
    }
    Ok(name)
}

/// Check every identifier in a list.
pub fn validate_identifiers<S: AsRef<str>>(names: &[S]) -> IngestResult<()> {
    for name in names {
        validate_identifier(name.as_ref())?;
    }
    Ok(())
}

/// Quote an already-validated identifier with double quotes, part by part.
///
/// Both ClickHouse and SQLite accept `"db"."table"`.
pub fn quote_identifier(name: &str) -> String {
    name.split('.').map(quote_name).collect::<Vec<_>>().join(".")
}

/// Quote a single name without splitting on dots. Embedded quotes are doubled.
pub fn quote_name(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}
