//! Metric index client implementation.
//!
//! This module provides the main client for writing metric records to the
//! search store. Pipeline code uses this to submit bulk batches and inspect
//! per-item outcomes.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::config::SearchIndexConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::MetricIndexProvider;
use crate::types::{BatchOperationSummary, IndexAction};
use export_indexer_shared::MetricRecord;

/// The main client for indexing metric records.
pub struct MetricIndexClient {
    provider: Arc<dyn MetricIndexProvider>,
    config: SearchIndexConfig,
}

impl MetricIndexClient {
    /// Create a new MetricIndexClient with default configuration.
    pub fn new(provider: Arc<dyn MetricIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexConfig::default(),
        }
    }

    /// Create a new MetricIndexClient with custom configuration.
    pub fn with_config(provider: Arc<dyn MetricIndexProvider>, config: SearchIndexConfig) -> Self {
        Self { provider, config }
    }

    /// Largest batch `index_batch` accepts, if limited.
    pub fn max_batch_size(&self) -> Option<usize> {
        self.config.max_batch_size
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchIndexError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchIndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Index a batch of records in one bulk request.
    /// Input: records to write, in the order their outcomes should be reported
    /// Output: Result<BatchOperationSummary, SearchIndexError>
    ///
    /// An empty batch returns an empty summary without contacting the store.
    /// Per-item rejections are reported in the summary; use
    /// [`BatchOperationSummary::into_result`] to treat them as an error.
    ///
    /// The batch size is limited by the configured max_batch_size (default: 1000).
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    pub async fn index_batch(
        &self,
        records: &[MetricRecord],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if records.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        self.validate_batch_size(records.len())?;

        let now = Utc::now();
        let actions: Vec<IndexAction> = records
            .iter()
            .map(|record| {
                IndexAction::for_record(
                    record,
                    &self.config.index_prefix,
                    &self.config.document_type,
                    &now,
                )
            })
            .collect();

        let summary = self.provider.bulk_index_documents(&actions).await?;

        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk index completed"
        );

        Ok(summary)
    }

    /// Check if the search store is reachable and healthy.
    pub async fn health_check(&self) -> Result<bool, SearchIndexError> {
        self.provider.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BatchOperationResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Mock provider for testing
    struct MockProvider {
        submitted: Mutex<Vec<IndexAction>>,
        calls: AtomicUsize,
        should_fail: bool,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                should_fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl MetricIndexProvider for MockProvider {
        async fn bulk_index_documents(
            &self,
            actions: &[IndexAction],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                return Err(SearchIndexError::connection("Mock failure"));
            }

            self.submitted.lock().await.extend_from_slice(actions);
            Ok(BatchOperationSummary::from_results(
                actions
                    .iter()
                    .map(|a| BatchOperationResult::succeeded(a.document_id.clone()))
                    .collect(),
            ))
        }

        async fn health_check(&self) -> Result<bool, SearchIndexError> {
            Ok(!self.should_fail)
        }
    }

    fn record(start: f64) -> MetricRecord {
        MetricRecord::from_epoch_seconds(start, start + 60.0, 10.0, 10.0, 10.0).unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_skips_provider() {
        let provider = Arc::new(MockProvider::new());
        let client = MetricIndexClient::new(provider.clone());

        let summary = client.index_batch(&[]).await.unwrap();

        assert_eq!(summary, BatchOperationSummary::empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_index_batch_builds_actions() {
        let provider = Arc::new(MockProvider::new());
        let client = MetricIndexClient::new(provider.clone());

        let summary = client
            .index_batch(&[record(1000.0), record(2000.0)])
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert!(summary.is_success());

        let submitted = provider.submitted.lock().await;
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].document_id, "computer:1000000");
        assert_eq!(submitted[1].document_id, "computer:2000000");
        assert_eq!(submitted[0].document_type, "doc");
        // qbserve-YYYY.MM
        assert!(submitted[0].bucket.starts_with("qbserve-"));
        assert_eq!(submitted[0].bucket.len(), "qbserve-".len() + 7);
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let provider = Arc::new(MockProvider::new());
        let client = MetricIndexClient::with_config(
            provider.clone(),
            SearchIndexConfig::default().index_prefix("activity-"),
        );

        client.index_batch(&[record(1000.0)]).await.unwrap();

        let submitted = provider.submitted.lock().await;
        assert!(submitted[0].bucket.starts_with("activity-"));
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let provider = Arc::new(MockProvider::new());
        let client =
            MetricIndexClient::with_config(provider.clone(), SearchIndexConfig::with_max_batch_size(1));

        let result = client.index_batch(&[record(1000.0), record(2000.0)]).await;

        assert!(matches!(
            result,
            Err(SearchIndexError::BatchSizeExceeded { provided: 2, max: 1 })
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let provider = Arc::new(MockProvider::failing());
        let client = MetricIndexClient::new(provider);

        let result = client.index_batch(&[record(1000.0)]).await;
        assert!(matches!(result, Err(SearchIndexError::ConnectionError(_))));
        assert!(!client.health_check().await.unwrap());
    }
}
