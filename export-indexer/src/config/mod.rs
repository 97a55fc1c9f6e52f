//! Runtime configuration for the export indexer.

mod dependencies;

pub use dependencies::Dependencies;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use export_indexer_pipeline::pattern::DEFAULT_EXPORT_PATTERN;
use export_indexer_repository::config::DEFAULT_INDEX_PREFIX;
use export_indexer_repository::SearchStoreConfig;

use crate::IndexingError;

/// Default export directory, relative to the working directory.
const DEFAULT_EXPORT_DIR: &str = "exports";

/// Default maximum number of documents per bulk request.
const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Default quiet period before a changed export is processed.
const DEFAULT_WATCH_DEBOUNCE_MS: u64 = 500;

/// Settings for one indexer process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub export_dir: PathBuf,
    pub export_pattern: String,
    pub store: SearchStoreConfig,
    pub index_prefix: String,
    pub max_batch_size: usize,
    pub watch_debounce: Duration,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `EXPORT_DIR`: directory to watch (default: exports)
    /// - `EXPORT_PATTERN`: export file name glob (default: *.json)
    /// - `ES_PROTOCOL`, `ES_HOST`, `ES_PORT`: search store address (default: http://localhost:9200)
    /// - `ES_USERNAME`, `ES_PASSWORD`: basic auth, used only when both are set
    /// - `ES_EMIT_DOCUMENT_TYPE`: send `_type` in bulk requests (default: false)
    /// - `INDEX_PREFIX`: destination bucket prefix (default: qbserve-)
    /// - `MAX_BATCH_SIZE`: documents per bulk request (default: 1000)
    /// - `WATCH_DEBOUNCE_MS`: watch quiet period in milliseconds (default: 500)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = SearchStoreConfig::default();

        let store = SearchStoreConfig {
            protocol: get("ES_PROTOCOL").unwrap_or(defaults.protocol),
            host: get("ES_HOST").unwrap_or(defaults.host),
            port: parse_or(get("ES_PORT"), "ES_PORT", defaults.port)?,
            username: get("ES_USERNAME"),
            password: get("ES_PASSWORD"),
            emit_document_type: match get("ES_EMIT_DOCUMENT_TYPE") {
                Some(value) => parse_bool(&value, "ES_EMIT_DOCUMENT_TYPE")?,
                None => defaults.emit_document_type,
            },
        };
        store.url()?;

        let max_batch_size = parse_or(get("MAX_BATCH_SIZE"), "MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE)?;
        if max_batch_size == 0 {
            return Err(IndexingError::config("MAX_BATCH_SIZE must be at least 1"));
        }

        let debounce_ms = parse_or(
            get("WATCH_DEBOUNCE_MS"),
            "WATCH_DEBOUNCE_MS",
            DEFAULT_WATCH_DEBOUNCE_MS,
        )?;

        Ok(Self {
            export_dir: PathBuf::from(get("EXPORT_DIR").unwrap_or_else(|| DEFAULT_EXPORT_DIR.to_string())),
            export_pattern: get("EXPORT_PATTERN").unwrap_or_else(|| DEFAULT_EXPORT_PATTERN.to_string()),
            store,
            index_prefix: get("INDEX_PREFIX").unwrap_or_else(|| DEFAULT_INDEX_PREFIX.to_string()),
            max_batch_size,
            watch_debounce: Duration::from_millis(debounce_ms),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, IndexingError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| IndexingError::config(format!("{} has an invalid value: {}", key, value))),
        None => Ok(default),
    }
}

fn parse_bool(value: &str, key: &str) -> Result<bool, IndexingError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(IndexingError::config(format!(
            "{} must be true or false, got: {}",
            key, value
        ))),
    }
}
