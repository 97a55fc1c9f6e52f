//! Processor module for the export indexer pipeline.
//!
//! Transforms raw exports into metric records.

mod metric_processor;

pub use metric_processor::{transform, MetricProcessor};
