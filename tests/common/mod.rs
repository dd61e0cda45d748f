//! Shared fixtures: SQLite files created with sqlx, gateways connected to them.

#![allow(dead_code)]

use flatfile_ingest::db::{ClientOptions, DatabaseGateway};
use flatfile_ingest::models::ConnectionConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};

/// Create `name` under `dir` and run `statements` against it.
pub async fn create_sqlite_db(dir: &Path, name: &str, statements: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await.unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
    path
}

pub fn sqlite_config(path: &Path) -> ConnectionConfig {
    ConnectionConfig::sqlite(path.to_str().unwrap())
}

pub async fn connected_gateway(path: &Path) -> DatabaseGateway {
    let gateway = DatabaseGateway::new(ClientOptions::default());
    gateway.connect(sqlite_config(path)).await.unwrap();
    gateway
}

/// The two-row table used by the export examples.
pub const SALES_TABLE: &[&str] = &[
    "CREATE TABLE sales (id INTEGER, date TEXT)",
    "INSERT INTO sales VALUES (1, '2023-01-01'), (2, '2023-02-15')",
];
