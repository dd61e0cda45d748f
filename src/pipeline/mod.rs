//! Data movement between the database and flat files.
//!
//! Pipelines borrow the gateway; they never own a connection.

pub mod catalog;
pub mod export;
pub mod import;

pub use catalog::{FileCatalog, format_size};
pub use export::ExportPipeline;
pub use import::ImportPipeline;
