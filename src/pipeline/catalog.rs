//! The upload directory: export listing, uploads and flat-file inspection.
//!
//! Listing ids are positions in the current listing (1-based, reverse
//! lexicographic by name). They are not stable: adding or removing a file
//! shifts them.

use crate::error::{IngestError, IngestResult};
use crate::flatfile::{EXPORT_SUFFIX, count_records, read_csv};
use crate::models::{FileColumn, FileContents, FilePreview, FileSummary, UploadedFile, number_rows};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Human-readable file size (1024-based, kB/MB/GB units).
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::WINDOWS)
}

#[derive(Debug, Clone)]
pub struct FileCatalog {
    dir: PathBuf,
}

impl FileCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Export files in the upload directory. A missing directory is an empty listing.
    pub async fn list_files(&self) -> IngestResult<Vec<FileSummary>> {
        let dir = self.dir.clone();
        run_blocking(move || list_exports(&dir)).await
    }

    /// One listed export file with its records.
    pub async fn read_file(&self, id: usize) -> IngestResult<FileContents> {
        let dir = self.dir.clone();
        run_blocking(move || {
            let files = list_exports(&dir)?;
            let file_info = id
                .checked_sub(1)
                .and_then(|idx| files.get(idx))
                .cloned()
                .ok_or_else(|| IngestError::file_not_found(format!("file id {}", id)))?;

            let table = read_csv(Path::new(&file_info.path), b',')?;
            let records = number_rows(&table.headers, table.typed_rows(usize::MAX));
            Ok(FileContents { file_info, records })
        })
        .await
    }

    /// Store an uploaded file under its base name and report its shape.
    ///
    /// A file that does not parse as CSV is removed again.
    pub async fn upload(&self, filename: &str, contents: Vec<u8>) -> IngestResult<UploadedFile> {
        let filename = safe_file_name(filename)?.to_string();
        let dir = self.dir.clone();
        let uploaded = run_blocking(move || {
            std::fs::create_dir_all(&dir).map_err(|e| {
                IngestError::internal(format!("Failed to create {}: {}", dir.display(), e))
            })?;
            let path = dir.join(&filename);
            std::fs::write(&path, &contents).map_err(|e| {
                IngestError::internal(format!("Failed to store {}: {}", path.display(), e))
            })?;

            let table = match read_csv(&path, b',') {
                Ok(table) => table,
                Err(e) => {
                    if let Err(cleanup) = std::fs::remove_file(&path) {
                        warn!(file_path = %path.display(), error = %cleanup, "Failed to remove rejected upload");
                    }
                    return Err(e);
                }
            };

            Ok(UploadedFile {
                filename,
                file_path: path.display().to_string(),
                row_count: table.rows.len(),
                column_count: table.headers.len(),
            })
        })
        .await?;

        info!(
            file_path = %uploaded.file_path,
            rows = uploaded.row_count,
            columns = uploaded.column_count,
            "Stored upload"
        );
        Ok(uploaded)
    }

    /// Header columns of a stored file with their inferred types.
    pub async fn file_columns(&self, filename: &str) -> IngestResult<Vec<FileColumn>> {
        let path = self.dir.join(safe_file_name(filename)?);
        run_blocking(move || Ok(read_csv(&path, b',')?.file_columns())).await
    }

    /// First `limit` rows of a stored file, typed, plus its total row count.
    pub async fn preview_file(&self, filename: &str, limit: usize) -> IngestResult<FilePreview> {
        let path = self.dir.join(safe_file_name(filename)?);
        run_blocking(move || {
            let table = read_csv(&path, b',')?;
            let records = number_rows(&table.headers, table.typed_rows(limit));
            Ok(FilePreview {
                total_rows: table.rows.len(),
                columns: table.headers,
                records,
            })
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> IngestResult<T>
where
    F: FnOnce() -> IngestResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IngestError::internal(format!("File task failed: {}", e)))?
}

fn list_exports(dir: &Path) -> IngestResult<Vec<FileSummary>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Upload directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(IngestError::internal(format!(
                "Failed to read {}: {}",
                dir.display(),
                e
            )));
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(EXPORT_SUFFIX))
        .collect();
    names.sort_unstable_by(|a, b| b.cmp(a));

    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(&name);
        if let Some(summary) = summarize_export(&path, name, files.len() + 1) {
            files.push(summary);
        }
    }
    Ok(files)
}

/// Files removed or unreadable between listing and reading are skipped.
fn summarize_export(path: &Path, name: String, id: usize) -> Option<FileSummary> {
    let size_bytes = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!(file_path = %path.display(), error = %e, "Skipping vanished file");
            return None;
        }
    };
    let record_count = match count_records(path) {
        Ok(count) => count,
        Err(e) => {
            warn!(file_path = %path.display(), error = %e, "Skipping unreadable file");
            return None;
        }
    };
    Some(FileSummary {
        id,
        record_count,
        path: path.display().to_string(),
        name,
        size_bytes,
        size: format_size(size_bytes),
    })
}

/// Accept a bare file name only.
fn safe_file_name(name: &str) -> IngestResult<&str> {
    let trimmed = name.trim();
    let rejected = trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\', '\0']);
    if rejected {
        return Err(IngestError::invalid_input(format!(
            "Invalid file name '{}': expected a bare file name",
            name
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("data.csv").unwrap(), "data.csv");
        for bad in ["", "../etc/passwd", "a/b.csv", "a\\b.csv", "..", "."] {
            assert!(
                matches!(safe_file_name(bad), Err(IngestError::InvalidInput { .. })),
                "expected rejection for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1 kB");
    }

    #[test]
    fn test_summarize_export_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();

        let gone = dir.path().join("gone_export.csv");
        assert!(summarize_export(&gone, "gone_export.csv".into(), 1).is_none());

        // Stat succeeds but reading fails
        let unreadable = dir.path().join("odd_export.csv");
        std::fs::create_dir(&unreadable).unwrap();
        assert!(summarize_export(&unreadable, "odd_export.csv".into(), 1).is_none());

        let good = dir.path().join("t_export.csv");
        std::fs::write(&good, "a\n1\n2\n").unwrap();
        let summary = summarize_export(&good, "t_export.csv".into(), 3).unwrap();
        assert_eq!(summary.id, 3);
        assert_eq!(summary.record_count, 2);
    }

    #[tokio::test]
    async fn test_upload_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(dir.path());

        let uploaded = catalog
            .upload("people.csv", b"id,name,score\n1,ann,1.5\n2,bob,\n".to_vec())
            .await
            .unwrap();
        assert_eq!(uploaded.filename, "people.csv");
        assert_eq!(uploaded.row_count, 2);
        assert_eq!(uploaded.column_count, 3);

        let columns = catalog.file_columns("people.csv").await.unwrap();
        let types: Vec<&str> = columns.iter().map(|c| c.type_name.as_str()).collect();
        assert_eq!(types, vec!["integer", "text", "float"]);

        let preview = catalog.preview_file("people.csv", 1).await.unwrap();
        assert_eq!(preview.total_rows, 2);
        assert_eq!(preview.records.len(), 1);
        assert_eq!(preview.records[0].id, 1);

        // Uploads are not exports
        assert!(catalog.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_upload_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(dir.path());
        let err = catalog
            .upload("bad.csv", b"a,b\n1\n".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
        assert!(!dir.path().join("bad.csv").exists());
    }

    #[tokio::test]
    async fn test_file_columns_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(dir.path());
        let err = catalog.file_columns("absent.csv").await.unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound { .. }));
    }
}
