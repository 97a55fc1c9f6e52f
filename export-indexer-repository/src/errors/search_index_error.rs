//! Search index error types.
//!
//! This module defines the error types that can occur while submitting
//! metric records to the search store.

use thiserror::Error;

/// Errors that can occur during search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., malformed connection settings).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The search store could not be reached or rejected the request as a
    /// whole (network failure, authentication, non-success HTTP status).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The bulk response could not be interpreted.
    #[error("Bulk operation error: {0}")]
    BulkOperationError(String),

    /// Failed to serialize a document for the search store.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Some items of an otherwise accepted bulk request were rejected.
    #[error("Bulk request partially failed for {} document(s): {}", failed_ids.len(), failed_ids.join(", "))]
    PartialFailure { failed_ids: Vec<String> },

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a bulk operation error.
    pub fn bulk_operation(msg: impl Into<String>) -> Self {
        Self::BulkOperationError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a partial failure error for the given document ids.
    pub fn partial_failure(failed_ids: Vec<String>) -> Self {
        Self::PartialFailure { failed_ids }
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }
}
