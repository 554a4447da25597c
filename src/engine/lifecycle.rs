//! Startup and shutdown coordination.

use super::TubeDownloader;
use crate::types::Event;
use std::sync::atomic::Ordering;

impl TubeDownloader {
    /// Gracefully shut down the engine
    ///
    /// Sequence:
    /// 1. Stop accepting new submissions (gateway returns `ShuttingDown`)
    /// 2. Signal the shutdown token; workers finish their current task and
    ///    exit, the cleanup sweep stops
    /// 3. Emit the shutdown event
    ///
    /// Claimed tasks run to a terminal state. Tasks accepted but not yet
    /// claimed are drained from the dispatch queue and failed with
    /// "engine shutting down", so every task a caller holds an id for
    /// reaches a terminal state before the workers exit.
    pub async fn shutdown(&self) {
        tracing::info!("initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("stopped accepting new submissions");

        self.shutdown_token.cancel();
        self.emit_event(Event::Shutdown);

        tracing::info!("shutdown signaled; workers will stop after their current task");
    }
}
