//! Scanner module for the export indexer pipeline.
//!
//! Lists the export files currently waiting in the export directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::errors::PipelineError;
use crate::pattern::ExportPattern;

/// Lists export files directly inside a directory.
///
/// Every call to [`scan`](ExportScanner::scan) re-reads the directory; the
/// scanner keeps no state between calls.
#[derive(Debug, Clone)]
pub struct ExportScanner {
    directory: PathBuf,
    pattern: ExportPattern,
}

impl ExportScanner {
    pub fn new(directory: impl Into<PathBuf>, pattern: ExportPattern) -> Self {
        Self {
            directory: directory.into(),
            pattern,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn pattern(&self) -> &ExportPattern {
        &self.pattern
    }

    /// List regular files whose name matches the export pattern, sorted by path.
    ///
    /// Subdirectories are not descended into. Entries that disappear while
    /// the listing is in progress are skipped.
    #[instrument(skip(self), fields(directory = %self.directory.display()))]
    pub async fn scan(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| PipelineError::io(&self.directory, e))?;

        let mut exports = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PipelineError::io(&self.directory, e))?
        {
            let path = entry.path();
            if !self.pattern.matches(&path) {
                continue;
            }

            // Follows symlinks, so a link to an export counts as an export.
            match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => exports.push(path),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(PipelineError::io(&path, e)),
            }
        }

        exports.sort();
        debug!(count = exports.len(), "Scanned export directory");
        Ok(exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::DEFAULT_EXPORT_PATTERN;
    use tempfile::TempDir;

    fn scanner(dir: &Path) -> ExportScanner {
        ExportScanner::new(dir, ExportPattern::new(DEFAULT_EXPORT_PATTERN).unwrap())
    }

    #[tokio::test]
    async fn test_scan_filters_by_pattern() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("report.csv"), "a,b").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.json"), "{}").unwrap();

        let found = scanner(dir.path()).scan().await.unwrap();

        assert_eq!(
            found,
            vec![dir.path().join("a.json"), dir.path().join("b.json")]
        );
    }

    #[tokio::test]
    async fn test_scan_is_restartable() {
        let dir = TempDir::new().unwrap();
        let scanner = scanner(dir.path());

        assert!(scanner.scan().await.unwrap().is_empty());

        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        assert_eq!(scanner.scan().await.unwrap().len(), 1);

        std::fs::remove_file(dir.path().join("a.json")).unwrap();
        assert!(scanner.scan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = scanner(&dir.path().join("missing")).scan().await;
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }
}
