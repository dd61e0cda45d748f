//! The single active database connection.
//!
//! `DatabaseGateway` is owned by the application state and handed by reference
//! to the pipelines. It is either Disconnected or Connected to exactly one
//! database; `connect` swaps the handle under a brief write lock and every
//! other operation clones the handle under a brief read lock.

use crate::db::client::{ClientOptions, DbClient, QueryRows};
use crate::db::schema::SchemaInspector;
use crate::error::{IngestError, IngestResult};
use crate::models::{ColumnDescriptor, ConnectionConfig, DatabaseType, TableDescriptor, TableRef, Value};
use crate::query::{validate_identifier, validate_identifiers};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug)]
struct ActiveConnection {
    client: DbClient,
    config: ConnectionConfig,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseGateway {
    active: Arc<RwLock<Option<Arc<ActiveConnection>>>>,
    options: ClientOptions,
}

impl DatabaseGateway {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            active: Arc::new(RwLock::new(None)),
            options,
        }
    }

    /// Replace the active connection and return the new database's tables.
    ///
    /// The previous handle is dropped first, so a failed attempt leaves the
    /// gateway Disconnected.
    pub async fn connect(&self, config: ConnectionConfig) -> IngestResult<Vec<TableDescriptor>> {
        let config = config.normalized();
        info!(db_type = %config.db_type, target = %config.describe(), "Connecting to database");

        let previous = self.active.write().await.take();
        if let Some(previous) = previous {
            info!(target = %previous.config.describe(), "Closing previous connection");
            previous.client.close().await;
        }

        let client = DbClient::connect(&config, &self.options).await?;
        let tables = match SchemaInspector::list_tables(&client).await {
            Ok(tables) => tables,
            Err(e) => {
                client.close().await;
                return Err(IngestError::connection(
                    format!("Connected but failed to list tables: {}", e),
                    "Check that the user may read the catalog",
                ));
            }
        };

        let displaced = self
            .active
            .write()
            .await
            .replace(Arc::new(ActiveConnection {
                client,
                config: config.clone(),
            }));
        if let Some(displaced) = displaced {
            // A concurrent connect finished first; last writer wins
            warn!(target = %displaced.config.describe(), "Replacing connection installed concurrently");
            displaced.client.close().await;
        }

        info!(
            db_type = %config.db_type,
            target = %config.describe(),
            tables = tables.len(),
            "Connected successfully"
        );
        Ok(tables)
    }

    async fn current(&self) -> IngestResult<Arc<ActiveConnection>> {
        self.active
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(IngestError::NotConnected)
    }

    pub async fn is_connected(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Backend of the active connection, if any.
    pub async fn db_type(&self) -> Option<DatabaseType> {
        self.active.read().await.as_ref().map(|c| c.client.db_type())
    }

    pub async fn list_tables(&self) -> IngestResult<Vec<TableDescriptor>> {
        let conn = self.current().await?;
        SchemaInspector::list_tables(&conn.client).await
    }

    /// Columns of a bare `table` or qualified `database.table`.
    pub async fn list_columns(&self, qualified_table: &str) -> IngestResult<Vec<ColumnDescriptor>> {
        let conn = self.current().await?;
        let table = TableRef::parse(qualified_table)?;
        SchemaInspector::list_columns(&conn.client, &table).await
    }

    /// Raw pass-through; rows come back in server order.
    pub async fn run_query(&self, sql: &str) -> IngestResult<QueryRows> {
        let conn = self.current().await?;
        conn.client.query(sql).await
    }

    /// Append `rows` to `table`. Every row must be aligned with `columns`.
    pub async fn insert_rows(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> IngestResult<()> {
        let conn = self.current().await?;
        validate_identifier(table)?;
        validate_identifiers(columns)?;
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(IngestError::invalid_input(format!(
                "Row has {} values but {} columns were given",
                row.len(),
                columns.len()
            )));
        }

        conn.client.insert(table, columns, rows).await?;
        info!(table, rows = rows.len(), "Inserted rows");
        Ok(())
    }

    /// Drop the active connection, if any.
    pub async fn close_all(&self) {
        let previous = self.active.write().await.take();
        if let Some(previous) = previous {
            info!(target = %previous.config.describe(), "Closing connection");
            previous.client.close().await;
        }
    }
}
