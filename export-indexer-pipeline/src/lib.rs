//! # Export Indexer Pipeline
//!
//! This crate provides the pipeline components for picking up activity
//! tracker exports from a directory and indexing them into the search store.
//!
//! ## Architecture
//!
//! The pipeline follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Scanner / Watcher**: Discover export files (startup sweep, then live notifications)
//! 2. **Reader**: Loads and parses an export file
//! 3. **Processor**: Transforms exports into metric records
//! 4. **Loader**: Indexes records and removes acknowledged files
//! 5. **Orchestrator**: Coordinates the pipeline flow

pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod pattern;
pub mod processor;
pub mod reader;
pub mod scanner;
pub mod watcher;

pub use errors::PipelineError;
pub use pattern::ExportPattern;
