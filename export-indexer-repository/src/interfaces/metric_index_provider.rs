//! Metric index provider trait definition.
//!
//! This module defines the abstract interface for bulk writes to the search
//! store, allowing for different backend implementations (OpenSearch,
//! Elasticsearch, in-memory mocks).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, IndexAction};

/// Abstracts the underlying search store implementation.
///
/// Implementations are injected into `MetricIndexClient` to enable dependency
/// injection and easy testing with mock implementations.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
#[async_trait]
pub trait MetricIndexProvider: Send + Sync {
    /// Submit index actions in a single bulk request.
    ///
    /// Documents with an existing id are replaced.
    ///
    /// # Arguments
    ///
    /// * `actions` - The documents to write, each with its destination bucket and id
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-item outcomes, in the same order as `actions`
    /// * `Err(SearchIndexError)` - If the request failed as a whole; nothing may be
    ///   assumed to have been written
    async fn bulk_index_documents(
        &self,
        actions: &[IndexAction],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Check if the search store is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the cluster is healthy
    /// * `Ok(false)` - If the cluster reports a red status
    /// * `Err(SearchIndexError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
