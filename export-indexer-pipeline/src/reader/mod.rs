//! Reader module for the export indexer pipeline.
//!
//! Loads a single export file from disk.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::errors::PipelineError;
use export_indexer_shared::RawExport;

/// Reads and parses export files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportReader;

impl ExportReader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse the export at `path`.
    ///
    /// Returns `Ok(None)` if the file no longer exists; it may have been
    /// processed and removed since it was discovered.
    ///
    /// # Errors
    ///
    /// * `CorruptExport` - The file is not valid JSON or not a JSON object
    /// * `Io` - Any other filesystem failure
    pub async fn read(&self, path: &Path) -> Result<Option<RawExport>, PipelineError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Export no longer exists");
                return Ok(None);
            }
            Err(e) => return Err(PipelineError::io(path, e)),
        };

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| PipelineError::corrupt(path, e.to_string()))?;

        RawExport::from_value(value)
            .map(Some)
            .ok_or_else(|| PipelineError::corrupt(path, "top-level value is not an object"))
    }
}
