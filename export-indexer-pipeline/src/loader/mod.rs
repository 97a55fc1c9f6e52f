//! Loader module for the export indexer pipeline.
//!
//! Indexes metric records into the search store and removes the export
//! files the store has acknowledged.

use std::io::ErrorKind;

use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use export_indexer_repository::{BatchOperationSummary, MetricIndexClient};
use export_indexer_shared::{ExportFileHandle, MetricRecord};

/// Loader that indexes records and acknowledges their source files.
///
/// The loader is responsible for:
/// - Splitting large batches to respect the client's batch size limit
/// - Reporting per-record outcomes in submission order
/// - Deleting export files once their records are indexed
pub struct ExportLoader {
    client: MetricIndexClient,
}

impl ExportLoader {
    /// Create a new loader with the given client.
    pub fn new(client: MetricIndexClient) -> Self {
        Self { client }
    }

    /// Index `records`, returning one result per record in input order.
    ///
    /// Batches larger than the client's limit are sent as consecutive
    /// chunks. A transport failure on any chunk fails the whole call; no
    /// result is reported for the chunks that did go through, so callers
    /// must not delete anything in that case.
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    pub async fn index(&self, records: &[MetricRecord]) -> Result<BatchOperationSummary, PipelineError> {
        if records.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        let chunk_size = self
            .client
            .max_batch_size()
            .filter(|max| *max > 0)
            .unwrap_or(records.len());

        let mut results = Vec::with_capacity(records.len());
        for chunk in records.chunks(chunk_size) {
            let summary = self.client.index_batch(chunk).await?;
            results.extend(summary.results);
        }

        let summary = BatchOperationSummary::from_results(results);
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Indexed records"
        );
        Ok(summary)
    }

    /// Delete an export file whose record has been indexed.
    ///
    /// Returns `Ok(false)` if the file was already gone.
    pub async fn remove_export(&self, handle: &ExportFileHandle) -> Result<bool, PipelineError> {
        match tokio::fs::remove_file(handle.path()).await {
            Ok(()) => {
                info!(path = %handle.path().display(), source = %handle.source(), "Removed export");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %handle.path().display(), "Export already removed");
                Ok(false)
            }
            Err(e) => Err(PipelineError::io(handle.path(), e)),
        }
    }

    /// Check if the search store is healthy.
    pub async fn health_check(&self) -> Result<bool, PipelineError> {
        Ok(self.client.health_check().await?)
    }
}
