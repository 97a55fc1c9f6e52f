//! Message types for the watcher.
//!
//! Defines the event structures that flow from the watcher to the orchestrator.

use std::path::PathBuf;

/// Kinds of change that can make an export ready for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The file appeared in the directory.
    Created,
    /// The file was written to or renamed into place.
    Modified,
}

/// A qualifying change to an export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Path of the export file.
    pub path: PathBuf,
    /// What happened to it. When several notifications are coalesced,
    /// `Created` wins over `Modified`.
    pub kind: ChangeKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}
