//! OpenSearch implementation of the metric index provider.
//!
//! This module provides a concrete implementation of `MetricIndexProvider`
//! using OpenSearch as the backend.

mod client;

pub use client::OpenSearchClient;
