//! Embedded SQLite backend (sqlx).
//!
//! A single-connection pool: the gateway serialises nothing itself, and SQLite
//! only allows one writer anyway.

use crate::db::client::{ClientOptions, QueryRows};
use crate::db::types::sqlite::{column_names, decode_row};
use crate::error::{IngestError, IngestResult};
use crate::models::{ConnectionConfig, Value};
use crate::query::quote_identifier;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::query::Query;
use sqlx::{Column, Executor, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Open the database file named by `config.database` (`:memory:` allowed).
    ///
    /// The file must already exist so that a mistyped path is reported
    /// instead of silently creating an empty database.
    pub async fn connect(config: &ConnectionConfig, options: &ClientOptions) -> IngestResult<Self> {
        let path = config.database.trim();
        if path.is_empty() {
            return Err(IngestError::connection(
                "SQLite database path is empty",
                "Set 'database' to the path of the SQLite file",
            ));
        }

        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{}", path)
        };
        let in_memory = path.contains(":memory:");

        let connect_options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| {
                IngestError::connection(
                    format!("Invalid SQLite path: {}", e),
                    "Check the path format: sqlite:path/to/db.sqlite",
                )
            })?
            .busy_timeout(options.query_timeout)
            .create_if_missing(in_memory);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(options.connect_timeout);
        if in_memory {
            // Dropping the only connection would drop the database
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                IngestError::connection(
                    format!("Failed to open SQLite database '{}': {}", path, e),
                    "Verify the file exists and is readable",
                )
            })?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> IngestResult<()> {
        sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await
            .map(|version| debug!(version = %version, "Got SQLite version"))
            .map_err(|e| {
                IngestError::connection(
                    format!("SQLite ping failed: {}", e),
                    "Verify the file is a valid SQLite database",
                )
            })
    }

    pub async fn query(&self, sql: &str) -> IngestResult<QueryRows> {
        debug!(sql = %sql, "Executing SQLite query");

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IngestError::query(e.to_string()))?;

        let columns = match rows.first() {
            Some(row) => column_names(row),
            // No rows to read names from; ask the planner instead
            None => self
                .pool
                .describe(sql)
                .await
                .map(|d| d.columns().iter().map(|c| c.name().to_string()).collect())
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to describe empty result");
                    Vec::new()
                }),
        };

        Ok(QueryRows::new(columns, rows.iter().map(decode_row).collect()))
    }

    /// One parameterised INSERT per row on a single connection. Not wrapped in
    /// a transaction: rows before a failure stay inserted.
    pub async fn insert(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> IngestResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let sql = insert_statement(table, columns);
        debug!(sql = %sql, rows = rows.len(), "Executing SQLite insert");

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| IngestError::insert(table, e.to_string()))?;

        for (idx, row) in rows.iter().enumerate() {
            let mut query = sqlx::query(&sql);
            for value in row {
                query = bind_value(query, value);
            }
            query.execute(&mut *conn).await.map_err(|e| {
                IngestError::insert(table, format!("row {}: {}", idx + 1, e))
            })?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn insert_statement(table: &str, columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        quoted.join(", "),
        placeholders
    )
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::UInt(v) => match i64::try_from(*v) {
            Ok(v) => query.bind(v),
            Err(_) => query.bind(v.to_string()),
        },
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Date(v) => query.bind(*v),
        Value::DateTime(v) => query.bind(*v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn memory_client() -> SqliteClient {
        SqliteClient::connect(&ConnectionConfig::sqlite(":memory:"), &ClientOptions::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_insert_statement() {
        let sql = insert_statement("main.t", &["a".to_string(), "b".to_string()]);
        assert_eq!(sql, "INSERT INTO \"main\".\"t\" (\"a\", \"b\") VALUES (?, ?)");
    }

    #[tokio::test]
    async fn test_query_decodes_storage_classes() {
        let client = memory_client().await;
        client
            .query("CREATE TABLE t (i INTEGER, r REAL, s TEXT, d DATE, b BLOB)")
            .await
            .unwrap();
        client
            .query("INSERT INTO t VALUES (7, 1.5, 'x', '2023-01-01', x'0102')")
            .await
            .unwrap();

        let result = client.query("SELECT i, r, s, d, b FROM t").await.unwrap();
        assert_eq!(result.columns, vec!["i", "r", "s", "d", "b"]);
        assert_eq!(
            result.rows[0],
            vec![
                Value::Int(7),
                Value::Float(1.5),
                Value::Text("x".into()),
                Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
                Value::Text("AQI=".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_result_still_reports_columns() {
        let client = memory_client().await;
        client.query("CREATE TABLE t (a INTEGER, b TEXT)").await.unwrap();
        let result = client.query("SELECT a, b FROM t").await.unwrap();
        assert_eq!(result.columns, vec!["a", "b"]);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_insert_binds_values() {
        let client = memory_client().await;
        client.query("CREATE TABLE t (a INTEGER, b TEXT)").await.unwrap();
        client
            .insert(
                "t",
                &["a".to_string(), "b".to_string()],
                &[
                    vec![Value::Int(1), Value::Text("it's".into())],
                    vec![Value::Int(2), Value::Null],
                ],
            )
            .await
            .unwrap();

        let result = client.query("SELECT a, b FROM t ORDER BY a").await.unwrap();
        assert_eq!(result.rows[0], vec![Value::Int(1), Value::Text("it's".into())]);
        assert_eq!(result.rows[1], vec![Value::Int(2), Value::Null]);
    }

    #[tokio::test]
    async fn test_query_error_carries_message() {
        let client = memory_client().await;
        let err = client.query("SELECT * FROM missing").await.unwrap_err();
        match err {
            IngestError::Query { message } => assert!(message.contains("missing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_into_missing_table() {
        let client = memory_client().await;
        let err = client
            .insert("nope", &["a".to_string()], &[vec![Value::Int(1)]])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Insert { .. }));
    }

    #[tokio::test]
    async fn test_connect_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let err = SqliteClient::connect(
            &ConnectionConfig::sqlite(path.to_string_lossy()),
            &ClientOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::Connection { .. }));
    }
}
