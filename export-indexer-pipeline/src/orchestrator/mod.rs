//! Orchestrator module for the export indexer pipeline.
//!
//! Coordinates the scanner, watcher, reader, processor, and loader
//! components: a one-time catch-up sweep, then sequential processing of
//! watch events until shutdown or a fatal error.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::loader::ExportLoader;
use crate::processor::MetricProcessor;
use crate::reader::ExportReader;
use crate::scanner::ExportScanner;
use crate::watcher::{ExportWatcher, FileEvent};
use export_indexer_shared::{DiscoverySource, ExportFileHandle, MetricRecord};

/// Lifecycle state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Sweeping,
    Watching,
    Processing,
    /// Stopped after a shutdown request.
    Stopped,
    /// Stopped by a fatal error.
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Sweeping => "sweeping",
            Self::Watching => "watching",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counts from the startup sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Export files found by the scan.
    pub discovered: usize,
    /// Records the store acknowledged.
    pub indexed: usize,
    /// Files removed after being indexed.
    pub deleted: usize,
    /// Files gone between scan and read.
    pub absent: usize,
    /// Files skipped because they could not be read or transformed.
    pub rejected: usize,
    /// Records the store refused; their files stay in place.
    pub failed: usize,
    /// Exports whose document id repeats an earlier export in the same
    /// sweep. The store keeps only the last document for an id.
    pub duplicates: usize,
}

/// Counts from the watch phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub indexed: usize,
    pub absent: usize,
    pub ignored: usize,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sweep: SweepReport,
    pub watch: WatchReport,
}

/// Result of handling a single watch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The record was indexed and the file removed.
    Indexed { document_id: String },
    /// The file was already gone.
    Absent,
    /// The path is not an export file.
    Ignored,
}

/// Handle used to request a graceful shutdown from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Stop the watch loop once the event in flight completes.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Sweeps exports already waiting at startup
/// - Processes watch events one at a time
/// - Deletes a file only after its record is acknowledged by the store
/// - Handles shutdown signals
pub struct Orchestrator {
    scanner: ExportScanner,
    watcher: ExportWatcher,
    reader: ExportReader,
    processor: MetricProcessor,
    loader: ExportLoader,
    state: PipelineState,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: Option<broadcast::Receiver<()>>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        scanner: ExportScanner,
        watcher: ExportWatcher,
        reader: ExportReader,
        processor: MetricProcessor,
        loader: ExportLoader,
    ) -> Self {
        // Subscribed up front so a shutdown requested before the watch
        // loop starts is not lost.
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            scanner,
            watcher,
            reader,
            processor,
            loader,
            state: PipelineState::Idle,
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Get a handle that can stop the orchestrator from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the orchestrator.
    ///
    /// Subscribes to the export directory, sweeps the files already present,
    /// then processes watch events until shutdown is requested. Notifications
    /// that arrive during the sweep are buffered and handled afterwards.
    ///
    /// Returns an error, leaving the orchestrator `Failed`, on the first
    /// fatal error.
    #[instrument(skip(self), fields(directory = %self.scanner.directory().display()))]
    pub async fn run(&mut self) -> Result<RunSummary, PipelineError> {
        info!("Starting export indexer orchestrator");

        let events = match self.watcher.watch().await {
            Ok(events) => events,
            Err(e) => return Err(self.fail(e)),
        };

        let sweep = self.sweep().await?;
        let watch = self.watch_loop(events).await?;

        info!(
            swept = sweep.indexed,
            watched = watch.indexed,
            "Orchestrator shutdown complete"
        );
        Ok(RunSummary { sweep, watch })
    }

    /// Index every export currently waiting in the directory.
    ///
    /// Files that cannot be read or transformed are logged and left in
    /// place. Records the store rejects keep their files. A transport
    /// failure deletes nothing and is returned as an error.
    #[instrument(skip(self))]
    pub async fn sweep(&mut self) -> Result<SweepReport, PipelineError> {
        self.state = PipelineState::Sweeping;
        let mut report = SweepReport::default();

        let paths = match self.scanner.scan().await {
            Ok(paths) => paths,
            Err(e) => return Err(self.fail(e)),
        };
        report.discovered = paths.len();

        let mut handles = Vec::with_capacity(paths.len());
        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match self.load_export(&path).await {
                Ok(Some(record)) => {
                    handles.push(ExportFileHandle::new(path, DiscoverySource::Sweep));
                    records.push(record);
                }
                Ok(None) => report.absent += 1,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Skipping export");
                    report.rejected += 1;
                }
            }
        }

        if records.is_empty() {
            info!("No waiting files");
            self.state = PipelineState::Watching;
            return Ok(report);
        }

        let mut seen = HashSet::with_capacity(records.len());
        for (handle, record) in handles.iter().zip(&records) {
            let document_id = record.document_id();
            if !seen.insert(document_id.clone()) {
                warn!(
                    path = %handle.path().display(),
                    document_id = %document_id,
                    "Export repeats a document id from this sweep, only one document will be kept"
                );
                report.duplicates += 1;
            }
        }

        let summary = match self.loader.index(&records).await {
            Ok(summary) => summary,
            Err(e) => return Err(self.fail(e)),
        };

        for (handle, result) in handles.iter().zip(&summary.results) {
            if !result.success {
                warn!(
                    path = %handle.path().display(),
                    document_id = %result.document_id,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "Export was not indexed, leaving it in place"
                );
                report.failed += 1;
                continue;
            }

            report.indexed += 1;
            match self.acknowledge(handle).await {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(e) => return Err(self.fail(e)),
            }
        }

        info!(
            discovered = report.discovered,
            indexed = report.indexed,
            deleted = report.deleted,
            rejected = report.rejected,
            failed = report.failed,
            duplicates = report.duplicates,
            "Sweep complete"
        );
        self.state = PipelineState::Watching;
        Ok(report)
    }

    /// Process watch events sequentially until shutdown.
    ///
    /// Every error is fatal, including the stream ending on its own.
    pub async fn watch_loop<S>(&mut self, mut events: S) -> Result<WatchReport, PipelineError>
    where
        S: Stream<Item = Result<FileEvent, PipelineError>> + Unpin,
    {
        let mut shutdown_rx = self
            .shutdown_rx
            .take()
            .unwrap_or_else(|| self.shutdown_tx.subscribe());
        let mut report = WatchReport::default();
        self.state = PipelineState::Watching;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    self.state = PipelineState::Stopped;
                    return Ok(report);
                }
                next = events.next() => {
                    let event = match next {
                        Some(Ok(event)) => event,
                        Some(Err(e)) => return Err(self.fail(e)),
                        None => {
                            return Err(self.fail(PipelineError::watch("watch stream ended unexpectedly")));
                        }
                    };

                    match self.process_event(&event).await {
                        Ok(ProcessOutcome::Indexed { .. }) => report.indexed += 1,
                        Ok(ProcessOutcome::Absent) => report.absent += 1,
                        Ok(ProcessOutcome::Ignored) => report.ignored += 1,
                        Err(e) => return Err(self.fail(e)),
                    }
                }
            }
        }
    }

    /// Read, transform, index and delete the file behind one watch event.
    ///
    /// Does not change the orchestrator to `Failed`; callers decide whether
    /// an error is fatal.
    #[instrument(skip(self, event), fields(path = %event.path.display(), kind = ?event.kind))]
    pub async fn process_event(&mut self, event: &FileEvent) -> Result<ProcessOutcome, PipelineError> {
        if !self.scanner.pattern().matches(&event.path) {
            debug!("Ignoring non-export path");
            return Ok(ProcessOutcome::Ignored);
        }

        self.state = PipelineState::Processing;
        let outcome = self.index_export(&event.path).await;
        self.state = PipelineState::Watching;
        outcome
    }

    async fn index_export(&self, path: &Path) -> Result<ProcessOutcome, PipelineError> {
        let Some(record) = self.load_export(path).await? else {
            return Ok(ProcessOutcome::Absent);
        };

        let summary = self
            .loader
            .index(std::slice::from_ref(&record))
            .await?
            .into_result()?;
        let document_id = summary
            .results
            .into_iter()
            .next()
            .map(|result| result.document_id)
            .unwrap_or_else(|| record.document_id());

        let handle = ExportFileHandle::new(path, DiscoverySource::Watch);
        self.acknowledge(&handle).await?;

        info!(document_id = %document_id, "Indexed export");
        Ok(ProcessOutcome::Indexed { document_id })
    }

    /// Read and transform one export. `Ok(None)` if the file is gone.
    async fn load_export(&self, path: &Path) -> Result<Option<MetricRecord>, PipelineError> {
        match self.reader.read(path).await? {
            Some(raw) => self.processor.process(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Delete an indexed export.
    async fn acknowledge(&self, handle: &ExportFileHandle) -> Result<bool, PipelineError> {
        self.loader.remove_export(handle).await.map_err(|e| {
            error!(path = %handle.path().display(), error = %e, "Export indexed but not deleted");
            e
        })
    }

    fn fail(&mut self, e: PipelineError) -> PipelineError {
        error!(error = %e, state = %self.state, "Pipeline failed");
        self.state = PipelineState::Failed;
        e
    }
}
