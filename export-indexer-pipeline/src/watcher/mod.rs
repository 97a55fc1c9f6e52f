//! Watcher module for the export indexer pipeline.
//!
//! Provides directory notifications for newly written export files.

mod export_watcher;
mod messages;

pub use export_watcher::{ExportEventStream, ExportWatcher, WatcherConfig};
pub use messages::{ChangeKind, FileEvent};
