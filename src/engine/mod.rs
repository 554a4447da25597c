//! Core download engine split into focused submodules.
//!
//! The `TubeDownloader` struct and its methods are organized by domain:
//! - [`gateway`] - Submission validation and task creation
//! - [`dispatcher`] - Worker pool pulling from the dispatch queue
//! - [`executor`] - Single-item download execution
//! - [`batch`] - Per-task orchestration and finalization
//! - [`cleanup`] - Retention sweep for terminal tasks
//! - [`lifecycle`] - Startup and shutdown coordination

mod batch;
mod cleanup;
mod dispatcher;
mod executor;
mod gateway;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::error::Result;
use crate::extractor::{Extractor, resolve_extractor};
use crate::muxer::{Muxer, resolve_muxer};
use crate::store::TaskStore;
use crate::types::{Event, HealthReport, Task, TaskId};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Main download engine instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the task store, the dispatch queue feeding the worker pool, and the
/// extraction/muxing collaborators chosen at construction time.
#[derive(Clone)]
pub struct TubeDownloader {
    /// Task records, shared with the API layer for status queries
    pub(crate) store: Arc<TaskStore>,
    /// Static configuration
    pub(crate) config: Arc<Config>,
    /// Extraction backend chosen at startup
    pub(crate) extractor: Arc<dyn Extractor>,
    /// Multiplexer for adaptive merges
    pub(crate) muxer: Arc<dyn Muxer>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Dispatch queue feeding the worker pool
    pub(crate) work_tx: tokio::sync::mpsc::Sender<TaskId>,
    /// Receiver half, shared by all workers
    pub(crate) work_rx: Arc<tokio::sync::Mutex<tokio::sync::mpsc::Receiver<TaskId>>>,
    /// Flag to indicate whether new submissions are accepted (false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancellation token observed by workers and the cleanup sweep
    pub(crate) shutdown_token: CancellationToken,
}

impl TubeDownloader {
    /// Create a new TubeDownloader instance
    ///
    /// Chooses the extraction backend and muxer from configuration, sets up
    /// the event broadcast channel and the bounded dispatch queue. Nothing
    /// is spawned until [`start`](Self::start).
    pub fn new(config: Config) -> Result<Self> {
        let extractor = resolve_extractor(&config.tools)?;
        let muxer = resolve_muxer(&config.tools);
        Self::with_collaborators(config, extractor, muxer)
    }

    /// Create an engine with explicit extraction and muxing backends
    ///
    /// The seam for custom backends and for tests that stub out the
    /// network and ffmpeg.
    pub fn with_collaborators(
        config: Config,
        extractor: Arc<dyn Extractor>,
        muxer: Arc<dyn Muxer>,
    ) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            extractor = extractor.name(),
            muxer = muxer.name(),
            muxer_available = muxer.available(),
            workers = config.workers.count,
            "engine initialized"
        );

        // Buffer of 1000 events; lagging subscribers get RecvError::Lagged
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);
        let (work_tx, work_rx) = tokio::sync::mpsc::channel(config.workers.queue_capacity);

        Ok(Self {
            store: Arc::new(TaskStore::new()),
            config: Arc::new(config),
            extractor,
            muxer,
            event_tx,
            work_tx,
            work_rx: Arc::new(tokio::sync::Mutex::new(work_rx)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Spawn the worker pool and the cleanup sweep
    ///
    /// Returns the join handles so callers can await them after shutdown.
    pub fn start(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = self.start_workers();
        handles.push(self.start_cleanup_task());
        handles
    }

    /// Subscribe to engine events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. Events are advisory and dropping them never affects
    /// task processing.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Snapshot of one task's current state
    pub async fn task_status(&self, id: TaskId) -> Result<Task> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| crate::error::Error::NotFound(format!("task {id}")))
    }

    /// Read-only health snapshot: counts plus static configuration
    pub async fn health(&self) -> HealthReport {
        let retention = &self.config.retention;
        HealthReport {
            status: "ok".to_string(),
            task_counts: self.store.counts().await,
            task_retention_minutes: retention.retention().as_secs() / 60,
            task_cleanup_interval_seconds: retention.cleanup_interval().as_secs(),
            workers: self.config.workers.count,
            extractor: self.extractor.name().to_string(),
            muxer_available: self.muxer.available(),
        }
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Whether the gateway still accepts submissions
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Emit an event to all subscribers
    ///
    /// send() errors when there are no receivers, which is fine; the event
    /// is dropped and processing continues.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(
        self: &Arc<Self>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = Arc::clone(self);
        let config = downloader.get_config();
        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
