//! Request and response types for search index operations.

use chrono::{DateTime, Utc};

use crate::errors::SearchIndexError;
use export_indexer_shared::MetricRecord;

/// Monthly destination bucket: `<prefix><YYYY>.<MM>`.
///
/// The bucket is derived from the ingestion date passed in, not from the
/// record's own timestamp, so backfilled exports land in the current month.
pub fn destination_bucket(prefix: &str, now: &DateTime<Utc>) -> String {
    format!("{}{}", prefix, now.format("%Y.%m"))
}

/// A single document write within a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAction {
    /// Destination bucket (index name).
    pub bucket: String,
    /// Document type, only sent to clusters that still accept it.
    pub document_type: String,
    /// Deterministic identity, `computer:<epoch millis>`.
    pub document_id: String,
    /// The document body.
    pub document: MetricRecord,
}

impl IndexAction {
    /// Build the action for `record` as ingested at `now`.
    pub fn for_record(
        record: &MetricRecord,
        prefix: &str,
        document_type: &str,
        now: &DateTime<Utc>,
    ) -> Self {
        Self {
            bucket: destination_bucket(prefix, now),
            document_type: document_type.to_string(),
            document_id: record.document_id(),
            document: record.clone(),
        }
    }
}

/// Result of a batch operation for a single item.
///
/// This struct represents the outcome of writing one document within a bulk
/// request. It indicates whether the write succeeded and includes the
/// store-side reason if it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperationResult {
    /// The document's identity.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error reported by the store if the operation failed.
    pub error: Option<String>,
}

impl BatchOperationResult {
    pub fn succeeded(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(document_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// `results` is in the same order as the submitted records, which lets callers
/// map each outcome back to the export file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Summary of a batch with nothing in it.
    pub fn empty() -> Self {
        Self::from_results(Vec::new())
    }

    /// Build a summary, deriving the counters from `results`.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// True when every item was accepted.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Ids of the rejected documents, in submission order.
    pub fn failed_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.document_id.clone())
            .collect()
    }

    /// Turn any per-item failure into [`SearchIndexError::PartialFailure`].
    pub fn into_result(self) -> Result<Self, SearchIndexError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SearchIndexError::partial_failure(self.failed_ids()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_destination_bucket_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(destination_bucket("qbserve-", &now), "qbserve-2024.03");

        let now = Utc.with_ymd_and_hms(2031, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(destination_bucket("", &now), "2031.12");
    }

    #[test]
    fn test_action_uses_ingestion_date_not_event_date() {
        // Session from 1970; ingested in 2024.
        let record = MetricRecord::from_epoch_seconds(1000.0, 1100.0, 20.0, 30.0, 50.0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 8, 0, 0).unwrap();

        let action = IndexAction::for_record(&record, "qbserve-", "doc", &now);

        assert_eq!(action.bucket, "qbserve-2024.05");
        assert_eq!(action.document_type, "doc");
        assert_eq!(action.document_id, "computer:1000000");
        assert_eq!(action.document, record);
    }

    #[test]
    fn test_summary_counters() {
        let summary = BatchOperationSummary::from_results(vec![
            BatchOperationResult::succeeded("computer:1"),
            BatchOperationResult::failed("computer:2", "mapper_parsing_exception"),
            BatchOperationResult::succeeded("computer:3"),
        ]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert_eq!(summary.failed_ids(), vec!["computer:2".to_string()]);
    }

    #[test]
    fn test_into_result() {
        let ok = BatchOperationSummary::from_results(vec![BatchOperationResult::succeeded("a")]);
        assert!(ok.into_result().is_ok());

        let partial = BatchOperationSummary::from_results(vec![
            BatchOperationResult::succeeded("a"),
            BatchOperationResult::failed("b", "rejected"),
        ]);
        match partial.into_result() {
            Err(SearchIndexError::PartialFailure { failed_ids }) => {
                assert_eq!(failed_ids, vec!["b".to_string()]);
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_summary_is_success() {
        let summary = BatchOperationSummary::empty();
        assert_eq!(summary.total, 0);
        assert!(summary.is_success());
        assert!(summary.results.is_empty());
    }
}
