//! CSV reading.
//!
//! Files are read whole into memory; nothing here streams.

use crate::error::{IngestError, IngestResult};
use crate::flatfile::infer::{ColumnKind, infer_kind};
use crate::models::{FileColumn, Value};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// A parsed CSV file: header plus raw string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Inferred kind of every header column.
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.headers.len())
            .map(|idx| infer_kind(self.rows.iter().map(|row| row[idx].as_str())))
            .collect()
    }

    pub fn file_columns(&self) -> Vec<FileColumn> {
        self.headers
            .iter()
            .zip(self.column_kinds())
            .map(|(name, kind)| FileColumn {
                name: name.clone(),
                type_name: kind.to_string(),
            })
            .collect()
    }

    /// Keep exactly `columns`, in that order, converting cells by the
    /// inferred kind of their column.
    pub fn project(&self, columns: &[String]) -> IngestResult<Vec<Vec<Value>>> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c).ok_or_else(|| IngestError::column_not_found(c)))
            .collect::<IngestResult<Vec<usize>>>()?;
        let kinds = self.column_kinds();

        Ok(self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|&idx| kinds[idx].convert(&row[idx]))
                    .collect()
            })
            .collect())
    }

    /// All columns, typed, for at most `limit` rows.
    pub fn typed_rows(&self, limit: usize) -> Vec<Vec<Value>> {
        let kinds = self.column_kinds();
        self.rows
            .iter()
            .take(limit)
            .map(|row| row.iter().zip(&kinds).map(|(cell, kind)| kind.convert(cell)).collect())
            .collect()
    }
}

/// Convert a caller-supplied delimiter to the single byte the CSV reader needs.
pub fn delimiter_byte(delimiter: char) -> IngestResult<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(|b| b.is_ascii() && *b != b'"' && *b != b'\n' && *b != b'\r')
        .ok_or_else(|| {
            IngestError::invalid_input(format!(
                "Delimiter {:?} must be a single ASCII character other than quote or newline",
                delimiter
            ))
        })
}

/// Read a CSV file with a header row. Every record must have as many
/// fields as the header.
pub fn read_csv(path: &Path, delimiter: u8) -> IngestResult<CsvTable> {
    let file_path = path.display().to_string();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => IngestError::file_not_found(&file_path),
        _ => IngestError::parse(&file_path, e.to_string()),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::parse(&file_path, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::parse(&file_path, e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(file_path = %file_path, columns = headers.len(), rows = rows.len(), "Read CSV");
    Ok(CsvTable { headers, rows })
}

/// Data rows in a file, counted by lines: newline count, plus one for a final
/// unterminated line, minus one header line.
pub fn count_records(path: &Path) -> IngestResult<usize> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => IngestError::file_not_found(path.display().to_string()),
        _ => IngestError::parse(path.display().to_string(), e.to_string()),
    })?;
    Ok(count_lines(&bytes).saturating_sub(1))
}

fn count_lines(bytes: &[u8]) -> usize {
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a\n"), 1);
        assert_eq!(count_lines(b"a\nb"), 2);
        assert_eq!(count_lines(b"a\nb\n"), 2);
    }

    #[test]
    fn test_count_records() {
        let file = csv_file("h\n1\n2\n3\n");
        assert_eq!(count_records(file.path()).unwrap(), 3);
        let file = csv_file("h\n1\n2\n3");
        assert_eq!(count_records(file.path()).unwrap(), 3);
        let file = csv_file("h\n");
        assert_eq!(count_records(file.path()).unwrap(), 0);
        let file = csv_file("");
        assert_eq!(count_records(file.path()).unwrap(), 0);
    }

    #[test]
    fn test_read_csv_with_delimiter() {
        let file = csv_file("a;b\n1;x\n2;\"y;z\"\n");
        let table = read_csv(file.path(), b';').unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows[1], vec!["2", "y;z"]);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_csv(&dir.path().join("nope.csv"), b',').unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound { .. }));
    }

    #[test]
    fn test_read_ragged_file_is_parse_error() {
        let file = csv_file("a,b\n1,2\n3\n");
        let err = read_csv(file.path(), b',').unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[test]
    fn test_project_orders_and_types_columns() {
        let file = csv_file("a,b,c\n1,x,2.5\n2,y,\n");
        let table = read_csv(file.path(), b',').unwrap();
        let rows = table.project(&["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(rows[0], vec![Value::Float(2.5), Value::Int(1)]);
        assert_eq!(rows[1], vec![Value::Null, Value::Int(2)]);

        let err = table.project(&["z".to_string()]).unwrap_err();
        assert!(matches!(err, IngestError::ColumnNotFound { column } if column == "z"));
    }

    #[test]
    fn test_file_columns() {
        let file = csv_file("id,name,score\n1,a,1.5\n2,b,2\n");
        let table = read_csv(file.path(), b',').unwrap();
        let kinds: Vec<String> = table.file_columns().into_iter().map(|c| c.type_name).collect();
        assert_eq!(kinds, vec!["integer", "text", "float"]);
    }

    #[test]
    fn test_delimiter_byte() {
        assert_eq!(delimiter_byte(',').unwrap(), b',');
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
        assert!(delimiter_byte('é').is_err());
        assert!(delimiter_byte('"').is_err());
    }
}
