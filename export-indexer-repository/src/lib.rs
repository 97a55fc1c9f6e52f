//! # Export Indexer Repository
//!
//! This crate provides traits and implementations for writing metric records
//! to the search store. It includes definitions for errors, interfaces, and a
//! concrete implementation for OpenSearch (and Elasticsearch-compatible
//! clusters).

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use client::MetricIndexClient;
pub use config::{SearchIndexConfig, SearchStoreConfig};
pub use errors::SearchIndexError;
pub use interfaces::MetricIndexProvider;
pub use opensearch::OpenSearchClient;
pub use types::{destination_bucket, BatchOperationResult, BatchOperationSummary, IndexAction};
