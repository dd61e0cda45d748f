//! Backend dispatch.
//!
//! One concrete client per supported database, wrapped in an enum so the
//! gateway never needs trait objects.

use crate::db::clickhouse::ClickHouseClient;
use crate::db::sqlite::SqliteClient;
use crate::error::IngestResult;
use crate::models::{ConnectionConfig, DatabaseType, Value};
use std::time::Duration;

/// Default client-side query timeout.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeouts handed to whichever client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub query_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Raw result of a query: column names and rows of scalars, both in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A connected database client.
#[derive(Debug)]
pub enum DbClient {
    ClickHouse(ClickHouseClient),
    SQLite(SqliteClient),
}

impl DbClient {
    /// Build a client for `config` and verify it can reach the database.
    pub async fn connect(config: &ConnectionConfig, options: &ClientOptions) -> IngestResult<Self> {
        let client = match config.db_type {
            DatabaseType::ClickHouse => Self::ClickHouse(ClickHouseClient::new(config, options)?),
            DatabaseType::SQLite => Self::SQLite(SqliteClient::connect(config, options).await?),
        };
        client.ping().await?;
        Ok(client)
    }

    pub fn db_type(&self) -> DatabaseType {
        match self {
            Self::ClickHouse(_) => DatabaseType::ClickHouse,
            Self::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Round-trip a trivial statement. Fails with `ConnectionError`.
    pub async fn ping(&self) -> IngestResult<()> {
        match self {
            Self::ClickHouse(c) => c.ping().await,
            Self::SQLite(c) => c.ping().await,
        }
    }

    /// Execute SQL and return its rows.
    pub async fn query(&self, sql: &str) -> IngestResult<QueryRows> {
        match self {
            Self::ClickHouse(c) => c.query(sql, &[]).await,
            Self::SQLite(c) => c.query(sql).await,
        }
    }

    /// Append rows to `table`. Identifiers must already be validated.
    pub async fn insert(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> IngestResult<()> {
        match self {
            Self::ClickHouse(c) => c.insert(table, columns, rows).await,
            Self::SQLite(c) => c.insert(table, columns, rows).await,
        }
    }

    /// Release the underlying connection resources.
    pub async fn close(&self) {
        match self {
            Self::ClickHouse(_) => {}
            Self::SQLite(c) => c.close().await,
        }
    }
}
