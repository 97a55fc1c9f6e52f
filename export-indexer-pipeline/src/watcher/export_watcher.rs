//! Directory watcher implementation for the export indexer.
//!
//! Subscribes to filesystem notifications on the export directory and turns
//! them into a stream of [`FileEvent`]s for matching files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, trace};

use crate::errors::PipelineError;
use crate::pattern::ExportPattern;
use crate::watcher::messages::{ChangeKind, FileEvent};

/// Configuration for the export watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// How long a path must stay quiet before its event is emitted.
    pub debounce: Duration,
    /// Size of the notification and event channel buffers.
    pub channel_buffer_size: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            channel_buffer_size: 256,
        }
    }
}

/// Watches the export directory for new or rewritten export files.
#[derive(Debug, Clone)]
pub struct ExportWatcher {
    directory: PathBuf,
    pattern: ExportPattern,
    config: WatcherConfig,
}

impl ExportWatcher {
    /// Create a new watcher with default configuration.
    pub fn new(directory: impl Into<PathBuf>, pattern: ExportPattern) -> Self {
        Self::with_config(directory, pattern, WatcherConfig::default())
    }

    /// Create a new watcher with custom configuration.
    pub fn with_config(
        directory: impl Into<PathBuf>,
        pattern: ExportPattern,
        config: WatcherConfig,
    ) -> Self {
        Self {
            directory: directory.into(),
            pattern,
            config,
        }
    }

    /// Subscribe to notifications on the export directory.
    ///
    /// Must be called from within a tokio runtime. The subscription lasts
    /// until the returned stream is dropped. The directory is resolved to its
    /// canonical absolute path first, so emitted events always carry
    /// absolute paths even when the watcher was configured with a relative
    /// or symlinked directory.
    ///
    /// # Errors
    ///
    /// * `Io` - The directory cannot be resolved
    /// * `Watch` - The OS watch could not be established
    pub async fn watch(&self) -> Result<ExportEventStream, PipelineError> {
        let directory = tokio::fs::canonicalize(&self.directory)
            .await
            .map_err(|e| PipelineError::io(&self.directory, e))?;

        let (raw_tx, raw_rx) = mpsc::channel(self.config.channel_buffer_size);

        // Runs on the notify backend thread. Blocking here is the backpressure
        // when the pipeline falls behind.
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.blocking_send(res);
        })?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        info!(
            directory = %directory.display(),
            pattern = %self.pattern.as_str(),
            debounce_ms = self.config.debounce.as_millis() as u64,
            "Watching export directory"
        );

        Ok(ExportEventStream::spawn(
            Some(watcher),
            raw_rx,
            directory,
            self.pattern.clone(),
            &self.config,
        ))
    }
}

/// Stream of qualifying export events.
///
/// Yields `Err(PipelineError::Watch)` once if the notification source fails;
/// the stream should not be polled for further events after that. Dropping
/// the stream stops the OS subscription.
pub struct ExportEventStream {
    events: ReceiverStream<Result<FileEvent, PipelineError>>,
    debouncer: JoinHandle<()>,
    _watcher: Option<RecommendedWatcher>,
}

impl ExportEventStream {
    fn spawn(
        watcher: Option<RecommendedWatcher>,
        notifications: mpsc::Receiver<notify::Result<Event>>,
        directory: PathBuf,
        pattern: ExportPattern,
        config: &WatcherConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer_size);
        let debouncer = tokio::spawn(debounce_notifications(
            notifications,
            tx,
            directory,
            pattern,
            config.debounce,
        ));

        Self {
            events: ReceiverStream::new(rx),
            debouncer,
            _watcher: watcher,
        }
    }

    /// Build a stream from an existing notification channel instead of an OS
    /// watch.
    #[cfg(test)]
    pub(crate) fn from_notifications(
        notifications: mpsc::Receiver<notify::Result<Event>>,
        directory: PathBuf,
        pattern: ExportPattern,
        config: &WatcherConfig,
    ) -> Self {
        Self::spawn(None, notifications, directory, pattern, config)
    }
}

impl Stream for ExportEventStream {
    type Item = Result<FileEvent, PipelineError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for ExportEventStream {
    fn drop(&mut self) {
        self.debouncer.abort();
    }
}

/// Coalesce raw notifications per path and forward them once the path has
/// been quiet for `window` (trailing edge).
async fn debounce_notifications(
    mut notifications: mpsc::Receiver<notify::Result<Event>>,
    events: mpsc::Sender<Result<FileEvent, PipelineError>>,
    directory: PathBuf,
    pattern: ExportPattern,
    window: Duration,
) {
    let mut pending: HashMap<PathBuf, (Instant, ChangeKind)> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|(deadline, _)| *deadline).min();
        let sleep_target = next_deadline.unwrap_or_else(|| Instant::now() + window);

        tokio::select! {
            notification = notifications.recv() => match notification {
                Some(Ok(event)) => {
                    if targets_directory_itself(&event, &directory) {
                        error!(directory = %directory.display(), kind = ?event.kind, "Export directory went away");
                        let _ = events
                            .send(Err(PipelineError::watch(format!(
                                "export directory {} was removed or moved",
                                directory.display()
                            ))))
                            .await;
                        return;
                    }

                    let Some(kind) = classify(&event.kind) else {
                        trace!(kind = ?event.kind, "Ignoring notification");
                        continue;
                    };

                    let deadline = Instant::now() + window;
                    for path in event.paths {
                        if !is_candidate(&path, &directory, &pattern) {
                            continue;
                        }
                        pending
                            .entry(path)
                            .and_modify(|(existing_deadline, existing_kind)| {
                                *existing_deadline = deadline;
                                if *existing_kind != ChangeKind::Created {
                                    *existing_kind = kind;
                                }
                            })
                            .or_insert((deadline, kind));
                    }
                }
                Some(Err(e)) => {
                    error!(error = %e, "File notification error");
                    let _ = events.send(Err(PipelineError::from(e))).await;
                    return;
                }
                None => {
                    let _ = events
                        .send(Err(PipelineError::watch("file notification channel closed")))
                        .await;
                    return;
                }
            },
            _ = tokio::time::sleep_until(sleep_target), if next_deadline.is_some() => {
                let now = Instant::now();
                let mut due: Vec<(Instant, PathBuf)> = pending
                    .iter()
                    .filter(|(_, (deadline, _))| *deadline <= now)
                    .map(|(path, (deadline, _))| (*deadline, path.clone()))
                    .collect();
                due.sort();

                for (_, path) in due {
                    let Some((_, kind)) = pending.remove(&path) else {
                        continue;
                    };
                    debug!(path = %path.display(), ?kind, "Export ready");
                    if events.send(Ok(FileEvent::new(path, kind))).await.is_err() {
                        // Consumer went away.
                        return;
                    }
                }
            }
        }
    }
}

fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => None,
        EventKind::Modify(_) | EventKind::Any => Some(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Remove(_) | EventKind::Other => None,
    }
}

fn targets_directory_itself(event: &Event, directory: &Path) -> bool {
    let removes = matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From))
    );
    removes && event.paths.iter().any(|p| p == directory)
}

fn is_candidate(path: &Path, directory: &Path, pattern: &ExportPattern) -> bool {
    path.parent() == Some(directory) && pattern.matches(path)
}
