//! Flat-file (CSV) input and output.
//!
//! - `reader`: parse with a caller-chosen delimiter, project columns, count records
//! - `writer`: write header + records via temp file and rename
//! - `infer`: per-column `integer` / `float` / `text` inference

pub mod infer;
pub mod reader;
pub mod writer;

pub use infer::{ColumnKind, infer_kind};
pub use reader::{CsvTable, count_records, delimiter_byte, read_csv};
pub use writer::write_csv;

/// Suffix identifying catalog-managed export files.
pub const EXPORT_SUFFIX: &str = "_export.csv";

/// Export file name for a table: `db.table` becomes `db_table_export.csv`.
pub fn export_file_name(table_name: &str) -> String {
    format!("{}{}", table_name.replace('.', "_"), EXPORT_SUFFIX)
}
