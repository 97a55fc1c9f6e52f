//! # Export Indexer Shared
//!
//! Shared types used across the export indexer crates: the raw export payload
//! read from disk, the normalized metric record that gets indexed, and the
//! handle that tracks an export file through the pipeline.

pub mod export;
pub mod metric;

pub use export::{DiscoverySource, ExportFileHandle, RawExport};
pub use metric::{document_id, MetricRecord};
