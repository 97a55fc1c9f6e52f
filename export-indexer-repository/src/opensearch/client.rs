//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `MetricIndexProvider`
//! using the OpenSearch Rust client and the `_bulk` API.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::config::SearchStoreConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::MetricIndexProvider;
use crate::types::{BatchOperationResult, BatchOperationSummary, IndexAction};

/// OpenSearch client implementation.
///
/// Writes metric documents through the bulk endpoint and reports the outcome
/// of every item.
///
/// # Example
///
/// ```ignore
/// use export_indexer_repository::{OpenSearchClient, SearchStoreConfig};
/// let client = OpenSearchClient::new(&SearchStoreConfig::default())?;
/// let summary = client.bulk_index_documents(&actions).await?;
/// println!("{} of {} accepted", summary.succeeded, summary.total);
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    emit_document_type: bool,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client from connection settings.
    ///
    /// # Arguments
    ///
    /// * `config` - Protocol, host, port and optional basic-auth credentials
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If the URL is invalid or transport setup fails
    pub fn new(config: &SearchStoreConfig) -> Result<Self, SearchIndexError> {
        let url = config.url()?;

        let conn_pool = SingleNodeConnectionPool::new(url.clone());
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some((username, password)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(
                username.to_string(),
                password.to_string(),
            ));
        }
        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(
            url = %url,
            authenticated = config.credentials().is_some(),
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            emit_document_type: config.emit_document_type,
        })
    }

    /// Build the newline-delimited bulk body: one action line followed by the
    /// document for every item.
    fn bulk_lines(&self, actions: &[IndexAction]) -> Result<Vec<Value>, SearchIndexError> {
        let mut lines = Vec::with_capacity(actions.len() * 2);

        for action in actions {
            let mut meta = json!({
                "_index": action.bucket,
                "_id": action.document_id,
            });
            if self.emit_document_type {
                meta["_type"] = json!(action.document_type);
            }

            let document = serde_json::to_value(&action.document)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

            lines.push(json!({ "index": meta }));
            lines.push(document);
        }

        Ok(lines)
    }

    /// Map the bulk response items back onto the submitted actions.
    ///
    /// The store answers items in request order. An item that is missing from
    /// the response is counted as failed so its source is never treated as
    /// indexed.
    fn parse_bulk_response(actions: &[IndexAction], response: &Value) -> BatchOperationSummary {
        let empty = Vec::new();
        let items = response
            .get("items")
            .and_then(|i| i.as_array())
            .unwrap_or(&empty);

        let results = actions
            .iter()
            .enumerate()
            .map(|(position, action)| {
                let item = match items.get(position).and_then(|i| i.get("index")) {
                    Some(item) => item,
                    None => {
                        return BatchOperationResult::failed(
                            action.document_id.clone(),
                            "missing from bulk response",
                        )
                    }
                };

                let status = item.get("status").and_then(|s| s.as_u64()).unwrap_or(0);
                match item.get("error") {
                    Some(err) => BatchOperationResult::failed(
                        action.document_id.clone(),
                        Self::describe_item_error(err),
                    ),
                    None if (200..300).contains(&status) => {
                        BatchOperationResult::succeeded(action.document_id.clone())
                    }
                    None => BatchOperationResult::failed(
                        action.document_id.clone(),
                        format!("unexpected item status {}", status),
                    ),
                }
            })
            .collect();

        BatchOperationSummary::from_results(results)
    }

    fn describe_item_error(err: &Value) -> String {
        let kind = err.get("type").and_then(|t| t.as_str());
        let reason = err.get("reason").and_then(|r| r.as_str());
        match (kind, reason) {
            (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
            (Some(kind), None) => kind.to_string(),
            _ => err.to_string(),
        }
    }
}

#[async_trait]
impl MetricIndexProvider for OpenSearchClient {
    /// Submit all actions in one `_bulk` request.
    ///
    /// A transport failure or a non-success HTTP status fails the whole batch
    /// with `ConnectionError`; otherwise every item gets its own result.
    #[instrument(skip(self, actions), fields(action_count = actions.len()))]
    async fn bulk_index_documents(
        &self,
        actions: &[IndexAction],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if actions.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        let body: Vec<JsonBody<Value>> = self
            .bulk_lines(actions)?
            .into_iter()
            .map(JsonBody::from)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::connection(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::bulk_operation(e.to_string()))?;

        let summary = Self::parse_bulk_response(actions, &response_body);

        if summary.failed > 0 {
            warn!(
                failed = summary.failed,
                failed_ids = ?summary.failed_ids(),
                "Bulk request had rejected items"
            );
        } else {
            debug!(count = summary.total, "Bulk request accepted");
        }

        Ok(summary)
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("red");
        debug!(status = %status, "Cluster health");
        Ok(status != "red")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use export_indexer_shared::MetricRecord;

    fn action(start: f64) -> IndexAction {
        let record = MetricRecord::from_epoch_seconds(start, start + 100.0, 20.0, 30.0, 50.0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        IndexAction::for_record(&record, "qbserve-", "doc", &now)
    }

    fn client(emit_document_type: bool) -> OpenSearchClient {
        OpenSearchClient::new(&SearchStoreConfig {
            emit_document_type,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_all_succeeded() {
        let actions = vec![action(1000.0), action(2000.0)];
        let response = json!({
            "took": 3,
            "errors": false,
            "items": [
                { "index": { "_index": "qbserve-2024.01", "_id": "computer:1000000", "status": 201 } },
                { "index": { "_index": "qbserve-2024.01", "_id": "computer:2000000", "status": 200 } }
            ]
        });

        let summary = OpenSearchClient::parse_bulk_response(&actions, &response);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(summary.is_success());
    }

    #[test]
    fn test_parse_partial_failure() {
        let actions = vec![action(1000.0), action(2000.0), action(3000.0)];
        let response = json!({
            "errors": true,
            "items": [
                { "index": { "status": 201 } },
                { "index": {
                    "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "failed to parse field" }
                } },
                { "index": { "status": 201 } }
            ]
        });

        let summary = OpenSearchClient::parse_bulk_response(&actions, &response);

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_ids(), vec!["computer:2000000".to_string()]);
        assert_eq!(
            summary.results[1].error.as_deref(),
            Some("mapper_parsing_exception: failed to parse field")
        );
    }

    #[test]
    fn test_parse_missing_items_count_as_failed() {
        let actions = vec![action(1000.0), action(2000.0)];
        let response = json!({
            "errors": false,
            "items": [ { "index": { "status": 201 } } ]
        });

        let summary = OpenSearchClient::parse_bulk_response(&actions, &response);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed_ids(), vec!["computer:2000000".to_string()]);
    }

    #[test]
    fn test_parse_non_success_status_without_error() {
        let actions = vec![action(1000.0)];
        let response = json!({ "items": [ { "index": { "status": 503 } } ] });

        let summary = OpenSearchClient::parse_bulk_response(&actions, &response);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_bulk_lines_layout() {
        let lines = client(false).bulk_lines(&[action(1000.0), action(2000.0)]).unwrap();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["index"]["_index"], "qbserve-2024.01");
        assert_eq!(lines[0]["index"]["_id"], "computer:1000000");
        assert!(lines[0]["index"].get("_type").is_none());
        assert_eq!(lines[1]["active_in_seconds"], 100.0);
        assert_eq!(lines[2]["index"]["_id"], "computer:2000000");
    }

    #[test]
    fn test_bulk_lines_with_document_type() {
        let lines = client(true).bulk_lines(&[action(1000.0)]).unwrap();
        assert_eq!(lines[0]["index"]["_type"], "doc");
    }

    #[test]
    fn test_new_rejects_bad_protocol() {
        let result = OpenSearchClient::new(&SearchStoreConfig {
            protocol: "ftp".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(SearchIndexError::ValidationError(_))));
    }

    #[test]
    fn test_new_with_credentials() {
        let result = OpenSearchClient::new(&SearchStoreConfig {
            username: Some("elastic".to_string()),
            password: Some("changeme".to_string()),
            emit_document_type: true,
            ..Default::default()
        });
        assert!(result.is_ok());
    }
}
