//! CSV writing.

use crate::error::{IngestError, IngestResult};
use crate::models::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Write `columns` as the header and one record per row, replacing any
/// existing file at `path`.
///
/// The data goes to a sibling temporary file that is renamed into place, so a
/// failed write never leaves a truncated file under the final name.
pub fn write_csv(path: &Path, columns: &[String], rows: &[Vec<Value>]) -> IngestResult<()> {
    let file_path = path.display().to_string();
    let tmp = temp_path(path);

    let result = write_records(&tmp, columns, rows)
        .and_then(|_| std::fs::rename(&tmp, path).map_err(csv::Error::from));

    if let Err(e) = result {
        if let Err(cleanup) = std::fs::remove_file(&tmp) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(file_path = %tmp.display(), error = %cleanup, "Failed to remove temporary file");
            }
        }
        return Err(IngestError::export_write(file_path, e.to_string()));
    }

    debug!(file_path = %file_path, rows = rows.len(), "Wrote CSV");
    Ok(())
}

fn write_records(path: &Path, columns: &[String], rows: &[Vec<Value>]) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_write_csv_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t_export.csv");
        let columns = vec!["id".to_string(), "date".to_string()];
        let rows = vec![
            vec![Value::Int(1), Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())],
            vec![Value::Int(2), Value::Date(NaiveDate::from_ymd_opt(2023, 2, 15).unwrap())],
        ];
        write_csv(&path, &columns, &rows).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id,date\n1,2023-01-01\n2,2023-02-15\n");
        // Only the final file remains
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_csv_quotes_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.csv");
        let rows = vec![vec![Value::Text("a,b".into()), Value::Null]];
        write_csv(&path, &["x".to_string(), "y".to_string()], &rows).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x,y\n\"a,b\",\n");
    }

    #[test]
    fn test_write_csv_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("o.csv");
        std::fs::write(&path, "old\ncontent\nhere\n").unwrap();
        write_csv(&path, &["a".to_string()], &[vec![Value::Int(1)]]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("f.csv");
        let err = write_csv(&path, &["a".to_string()], &[]).unwrap_err();
        assert!(matches!(err, IngestError::ExportWrite { .. }));
        assert!(!path.exists());
    }
}
