//! Schema introspection.
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! backend. Backend-specific implementations live in their own submodules, each
//! providing the same interface.

use crate::db::client::{DbClient, QueryRows};
use crate::error::{IngestError, IngestResult};
use crate::models::{ColumnDescriptor, TableDescriptor, TableRef, Value};
use tracing::debug;

/// Schema inspector for catalog introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List every table outside the system databases, ordered by qualified name.
    pub async fn list_tables(client: &DbClient) -> IngestResult<Vec<TableDescriptor>> {
        let mut tables = match client {
            DbClient::ClickHouse(c) => clickhouse::list_tables(c).await?,
            DbClient::SQLite(c) => sqlite::list_tables(c).await?,
        };
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = tables.len(), db_type = %client.db_type(), "Listed tables");
        Ok(tables)
    }

    /// List a table's columns in physical order. A bare name resolves against
    /// the connection's default database.
    pub async fn list_columns(
        client: &DbClient,
        table: &TableRef,
    ) -> IngestResult<Vec<ColumnDescriptor>> {
        let columns = match client {
            DbClient::ClickHouse(c) => clickhouse::list_columns(c, table).await?,
            DbClient::SQLite(c) => sqlite::list_columns(c, table).await?,
        };
        debug!(table = %table.table, count = columns.len(), "Listed columns");
        Ok(columns)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod clickhouse {
        pub const LIST_TABLES: &str = r#"
            SELECT concat(database, '.', name) AS qualified_name, engine, total_rows
            FROM system.tables
            WHERE database NOT IN ('system', 'INFORMATION_SCHEMA', 'information_schema')
            AND NOT is_temporary
            ORDER BY qualified_name
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT name, type, default_kind, default_expression
            FROM system.columns
            WHERE database = {database:String} AND table = {table:String}
            ORDER BY position
            "#;
    }

    pub mod sqlite {
        pub const LIST_SCHEMAS: &str =
            "SELECT name FROM pragma_database_list WHERE name != 'temp' ORDER BY name";

        /// `{schema}` is substituted with the quoted schema name.
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM {schema}.sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT name, type, dflt_value
            FROM pragma_table_info(?1, ?2)
            ORDER BY cid
            "#;
    }
}

/// Cell as an owned string; NULL becomes None.
fn text_cell(row: &[Value], idx: usize) -> Option<String> {
    row.get(idx).filter(|v| !v.is_null()).map(|v| v.to_string())
}

fn u64_cell(row: &[Value], idx: usize) -> Option<u64> {
    match row.get(idx)? {
        Value::UInt(v) => Some(*v),
        Value::Int(v) => u64::try_from(*v).ok(),
        Value::Text(v) => v.parse().ok(),
        _ => None,
    }
}

fn required_text(rows: &QueryRows, row: &[Value], idx: usize) -> IngestResult<String> {
    text_cell(row, idx).ok_or_else(|| {
        IngestError::internal(format!(
            "Catalog query returned no value for column {}",
            rows.columns.get(idx).map(String::as_str).unwrap_or("?")
        ))
    })
}

// =============================================================================
// Backend-Specific Implementations
// =============================================================================

mod clickhouse {
    use super::*;
    use crate::db::clickhouse::ClickHouseClient;

    pub async fn list_tables(client: &ClickHouseClient) -> IngestResult<Vec<TableDescriptor>> {
        let result = client.query(queries::clickhouse::LIST_TABLES, &[]).await?;
        result
            .rows
            .iter()
            .map(|row| {
                Ok(TableDescriptor::new(
                    required_text(&result, row, 0)?,
                    text_cell(row, 1).unwrap_or_default(),
                    u64_cell(row, 2),
                ))
            })
            .collect()
    }

    pub async fn list_columns(
        client: &ClickHouseClient,
        table: &TableRef,
    ) -> IngestResult<Vec<ColumnDescriptor>> {
        let database = table.database.as_deref().unwrap_or(client.database());
        let result = client
            .query(
                queries::clickhouse::LIST_COLUMNS,
                &[("database", database), ("table", table.table.as_str())],
            )
            .await?;

        result
            .rows
            .iter()
            .map(|row| {
                Ok(ColumnDescriptor::new(
                    required_text(&result, row, 0)?,
                    required_text(&result, row, 1)?,
                )
                .with_default(text_cell(row, 2), text_cell(row, 3)))
            })
            .collect()
    }
}

mod sqlite {
    use super::*;
    use crate::db::sqlite::SqliteClient;
    use crate::query::quote_name;
    use sqlx::Row;

    const ENGINE: &str = "SQLite";
    const DEFAULT_SCHEMA: &str = "main";

    pub async fn list_tables(client: &SqliteClient) -> IngestResult<Vec<TableDescriptor>> {
        let pool = client.pool();
        let schemas: Vec<String> = sqlx::query_scalar(queries::sqlite::LIST_SCHEMAS)
            .fetch_all(pool)
            .await
            .map_err(|e| IngestError::query(e.to_string()))?;

        let mut tables = Vec::new();
        for schema in &schemas {
            let sql = queries::sqlite::LIST_TABLES.replace("{schema}", &quote_name(schema));
            let names: Vec<String> = sqlx::query_scalar(&sql)
                .fetch_all(pool)
                .await
                .map_err(|e| IngestError::query(e.to_string()))?;

            for name in names {
                let count_sql = format!(
                    "SELECT COUNT(*) FROM {}.{}",
                    quote_name(schema),
                    quote_name(&name)
                );
                let row_count = sqlx::query_scalar::<_, i64>(&count_sql)
                    .fetch_one(pool)
                    .await
                    .ok()
                    .and_then(|n| u64::try_from(n).ok());
                tables.push(TableDescriptor::new(
                    format!("{}.{}", schema, name),
                    ENGINE,
                    row_count,
                ));
            }
        }
        Ok(tables)
    }

    pub async fn list_columns(
        client: &SqliteClient,
        table: &TableRef,
    ) -> IngestResult<Vec<ColumnDescriptor>> {
        let schema = table.database.as_deref().unwrap_or(DEFAULT_SCHEMA);
        let rows = sqlx::query(queries::sqlite::LIST_COLUMNS)
            .bind(table.table.as_str())
            .bind(schema)
            .fetch_all(client.pool())
            .await
            .map_err(|e| IngestError::query(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let data_type: String = row.get("type");
                let default_value: Option<String> = row.try_get("dflt_value").ok().flatten();
                let kind = default_value.as_ref().map(|_| "DEFAULT".to_string());
                ColumnDescriptor::new(name, data_type).with_default(kind, default_value)
            })
            .collect())
    }
}
