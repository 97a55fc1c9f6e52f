//! Error types for the export indexer pipeline.

use std::path::{Path, PathBuf};

use export_indexer_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur in the export indexer pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required field is missing or invalid.
    #[error("Malformed export: {0}")]
    MalformedExport(String),

    /// The export file exists but is not a valid JSON object.
    #[error("Corrupt export {}: {reason}", path.display())]
    CorruptExport { path: PathBuf, reason: String },

    /// Filesystem error for a specific path.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory watch failed; the pipeline cannot continue.
    #[error("Watch error: {0}")]
    Watch(String),

    /// The search store could not take the batch at all.
    #[error("Index transport error: {0}")]
    IndexTransport(String),

    /// The store rejected some documents of the batch.
    #[error("Index partially failed for: {}", failed_ids.join(", "))]
    IndexPartialFailure { failed_ids: Vec<String> },

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create a malformed export error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedExport(msg.into())
    }

    /// Create a corrupt export error.
    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::CorruptExport {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create an IO error for a path.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a watch error.
    pub fn watch(msg: impl Into<String>) -> Self {
        Self::Watch(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<SearchIndexError> for PipelineError {
    fn from(err: SearchIndexError) -> Self {
        match err {
            SearchIndexError::PartialFailure { failed_ids } => {
                Self::IndexPartialFailure { failed_ids }
            }
            other => Self::IndexTransport(other.to_string()),
        }
    }
}

impl From<notify::Error> for PipelineError {
    fn from(err: notify::Error) -> Self {
        Self::Watch(err.to_string())
    }
}
