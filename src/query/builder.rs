//! SELECT construction, with optional multi-table join.
//!
//! Tables in a join are chained strictly in list order:
//!
//! ```text
//! SELECT a.x, b.y FROM a
//!     INNER JOIN b ON a.k1 = b.k1
//!     INNER JOIN c ON b.k2 = c.k2
//! ```

use crate::error::{IngestError, IngestResult};
use crate::models::JoinSpec;
use crate::query::identifier::{validate_identifier, validate_identifiers};
use tracing::debug;

/// Builder for the export/preview SELECT statement.
#[derive(Debug, Clone)]
pub struct SelectBuilder<'a> {
    table: &'a str,
    columns: &'a [String],
    join: Option<&'a JoinSpec>,
    limit: Option<u32>,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(table: &'a str, columns: &'a [String]) -> Self {
        Self {
            table,
            columns,
            join: None,
            limit: None,
        }
    }

    pub fn join(mut self, join: Option<&'a JoinSpec>) -> Self {
        self.join = join;
        self
    }

    /// Cap the number of rows. Only previews set this; exports read everything.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validate all inputs and render the SQL string.
    pub fn build(&self) -> IngestResult<String> {
        if self.columns.is_empty() {
            return Err(IngestError::invalid_input("At least one column must be selected"));
        }
        validate_identifier(self.table)?;
        validate_identifiers(self.columns)?;

        let mut sql = match self.join {
            None => format!("SELECT {} FROM {}", self.columns.join(", "), self.table),
            Some(spec) => build_join(self.columns, spec)?,
        };

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        debug!(sql = %sql, "Built select");
        Ok(sql)
    }
}

fn build_join(columns: &[String], spec: &JoinSpec) -> IngestResult<String> {
    if spec.tables.len() < 2 {
        return Err(IngestError::insufficient_tables(spec.tables.len()));
    }
    validate_identifiers(&spec.tables)?;

    // Resolve every key before emitting anything.
    let mut clauses = Vec::with_capacity(spec.tables.len() - 1);
    for pair in spec.tables.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        let key = spec
            .key_for(left, right)
            .ok_or_else(|| IngestError::missing_join_key(left, right))?;
        validate_identifier(key)?;
        clauses.push(format!(
            "{} JOIN {} ON {}.{} = {}.{}",
            spec.join_type.as_sql(),
            right,
            left,
            key,
            right,
            key
        ));
    }

    let base = &spec.tables[0];
    let selected: Vec<String> = columns
        .iter()
        .map(|column| qualify_column(base, column))
        .collect();

    Ok(format!(
        "SELECT {} FROM {} {}",
        selected.join(", "),
        base,
        clauses.join(" ")
    ))
}

/// Columns already written `table.column` pass through; bare ones belong to `base`.
fn qualify_column(base: &str, column: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", base, column)
    }
}

/// Full export query: no row cap.
pub fn build_select(table: &str, columns: &[String], join: Option<&JoinSpec>) -> IngestResult<String> {
    SelectBuilder::new(table, columns).join(join).build()
}

/// Preview query: capped at `limit` rows.
pub fn build_preview(
    table: &str,
    columns: &[String],
    join: Option<&JoinSpec>,
    limit: u32,
) -> IngestResult<String> {
    SelectBuilder::new(table, columns).join(join).limit(limit).build()
}
