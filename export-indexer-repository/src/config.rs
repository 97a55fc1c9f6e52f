//! Configuration types for the index client and the search store connection.

use url::Url;

use crate::errors::SearchIndexError;

/// Default prefix for the monthly destination buckets.
pub const DEFAULT_INDEX_PREFIX: &str = "qbserve-";

/// Default document type attached to every index action.
pub const DEFAULT_DOCUMENT_TYPE: &str = "doc";

/// Configuration for the MetricIndexClient.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Maximum number of documents allowed in a single batch operation.
    /// Set to None to disable the limit (not recommended for production).
    pub max_batch_size: Option<usize>,
    /// Prefix of the destination bucket, e.g. `qbserve-` gives `qbserve-2024.05`.
    pub index_prefix: String,
    /// Document type recorded on each index action.
    pub document_type: String,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        }
    }
}

impl SearchIndexConfig {
    /// Create a config with no batch size limit (use with caution).
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Self::default()
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }

    /// Replace the bucket prefix.
    pub fn index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }
}

/// Connection parameters for the search store.
#[derive(Debug, Clone)]
pub struct SearchStoreConfig {
    /// `http` or `https`.
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Emit `_type` in bulk action lines. Only legacy Elasticsearch clusters
    /// accept it; OpenSearch 2 rejects the field.
    pub emit_document_type: bool,
}

impl Default for SearchStoreConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 9200,
            username: None,
            password: None,
            emit_document_type: false,
        }
    }
}

impl SearchStoreConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200/`.
    pub fn url(&self) -> Result<Url, SearchIndexError> {
        let raw = format!("{}://{}:{}", self.protocol, self.host, self.port);
        let url = Url::parse(&raw)
            .map_err(|e| SearchIndexError::validation(format!("Invalid store URL {}: {}", raw, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SearchIndexError::validation(format!(
                "Unsupported protocol: {}",
                other
            ))),
        }
    }

    /// Basic-auth credentials, only when both username and password are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_index_config() {
        let config = SearchIndexConfig::default();
        assert_eq!(config.max_batch_size, Some(1000));
        assert_eq!(config.index_prefix, "qbserve-");
        assert_eq!(config.document_type, "doc");
    }

    #[test]
    fn test_index_config_builders() {
        assert!(SearchIndexConfig::unlimited().max_batch_size.is_none());

        let config = SearchIndexConfig::with_max_batch_size(10).index_prefix("metrics-");
        assert_eq!(config.max_batch_size, Some(10));
        assert_eq!(config.index_prefix, "metrics-");
    }

    #[test]
    fn test_store_url() {
        let config = SearchStoreConfig {
            protocol: "https".to_string(),
            host: "search.internal".to_string(),
            port: 9243,
            ..Default::default()
        };
        assert_eq!(config.url().unwrap().as_str(), "https://search.internal:9243/");
    }

    #[test]
    fn test_store_url_rejects_unknown_protocol() {
        let config = SearchStoreConfig {
            protocol: "ftp".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.url(),
            Err(SearchIndexError::ValidationError(_))
        ));
    }

    #[test]
    fn test_credentials_require_both_parts() {
        let mut config = SearchStoreConfig::default();
        assert!(config.credentials().is_none());

        config.username = Some("elastic".to_string());
        assert!(config.credentials().is_none());

        config.password = Some("secret".to_string());
        assert_eq!(config.credentials(), Some(("elastic", "secret")));
    }
}
