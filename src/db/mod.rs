//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The gateway holding the single active connection
//! - Backend clients (ClickHouse over HTTP, SQLite over sqlx)
//! - Schema introspection
//! - Type mappings

pub mod clickhouse;
pub mod client;
pub mod gateway;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use client::{ClientOptions, DbClient, QueryRows};
pub use gateway::DatabaseGateway;
pub use schema::SchemaInspector;
