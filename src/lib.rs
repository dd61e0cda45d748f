//! Flat-file ingestion service library.
//!
//! Moves table data between a database (ClickHouse over HTTP, or SQLite)
//! and CSV files: export with optional multi-table joins, import, and an
//! upload directory catalog, all served over a small REST API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod flatfile;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod transport;

pub use config::Config;
pub use error::IngestError;
