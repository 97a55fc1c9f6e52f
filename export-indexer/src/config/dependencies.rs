//! Dependency initialization and wiring for the export indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::IndexingError;
use export_indexer_pipeline::{
    loader::ExportLoader,
    orchestrator::Orchestrator,
    processor::MetricProcessor,
    reader::ExportReader,
    scanner::ExportScanner,
    watcher::{ExportWatcher, WatcherConfig},
    ExportPattern,
};
use export_indexer_repository::{MetricIndexClient, OpenSearchClient, SearchIndexConfig};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from `settings`.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If the export directory is missing, the
    ///   pattern is invalid, or the search store is unreachable or unhealthy
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            export_dir = %settings.export_dir.display(),
            export_pattern = %settings.export_pattern,
            host = %settings.store.host,
            port = settings.store.port,
            index_prefix = %settings.index_prefix,
            "Initializing dependencies"
        );

        let metadata = tokio::fs::metadata(&settings.export_dir).await.map_err(|e| {
            IndexingError::config(format!(
                "Export directory {} is not accessible: {}",
                settings.export_dir.display(),
                e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(IndexingError::config(format!(
                "{} is not a directory",
                settings.export_dir.display()
            )));
        }

        let pattern = ExportPattern::new(&settings.export_pattern)?;

        // Initialize OpenSearch client
        let search_client = OpenSearchClient::new(&settings.store)
            .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        let index_config = SearchIndexConfig::with_max_batch_size(settings.max_batch_size)
            .index_prefix(settings.index_prefix.clone());
        let loader = ExportLoader::new(MetricIndexClient::with_config(
            Arc::new(search_client),
            index_config,
        ));

        // Verify OpenSearch is reachable
        let healthy = loader
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let watcher = ExportWatcher::with_config(
            settings.export_dir.clone(),
            pattern.clone(),
            WatcherConfig {
                debounce: settings.watch_debounce,
                ..WatcherConfig::default()
            },
        );

        let orchestrator = Orchestrator::new(
            ExportScanner::new(settings.export_dir.clone(), pattern),
            watcher,
            ExportReader::new(),
            MetricProcessor::new(),
            loader,
        );

        Ok(Self { orchestrator })
    }
}
