//! Worker pool pulling task ids off the dispatch queue.

use super::TubeDownloader;
use crate::types::{Event, TaskId};

impl TubeDownloader {
    /// Spawn the fixed worker pool
    ///
    /// Every worker loops: lock the shared receiver, wait for the next task
    /// id or the shutdown signal, release the lock, run the task. A claimed
    /// task always runs to a terminal state; the shutdown signal only stops
    /// workers between tasks. The worker that observes the signal drains
    /// the queue and fails every unclaimed id, so an accepted task never
    /// sits `queued` with no worker left to run it.
    pub(crate) fn start_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.workers.count)
            .map(|worker| {
                let engine = self.clone();
                tokio::spawn(async move {
                    tracing::debug!(worker, "worker started");
                    loop {
                        let next = {
                            let mut rx = engine.work_rx.lock().await;
                            tokio::select! {
                                biased;
                                _ = engine.shutdown_token.cancelled() => {
                                    while let Ok(id) = rx.try_recv() {
                                        engine.abandon_task(id).await;
                                    }
                                    None
                                }
                                id = rx.recv() => id,
                            }
                        };

                        let Some(id) = next else {
                            break;
                        };
                        engine.run_task(worker, id).await;
                    }
                    tracing::debug!(worker, "worker stopped");
                })
            })
            .collect()
    }

    /// Fail a task that was accepted but never claimed before shutdown
    async fn abandon_task(&self, id: TaskId) {
        tracing::warn!(task_id = %id, "failing unclaimed task at shutdown");
        match self
            .store
            .fail_task(id, "engine shutting down".to_string())
            .await
        {
            Ok(task) => self.emit_event(Event::TaskFailed {
                id,
                error: task.error.unwrap_or_default(),
            }),
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "could not fail unclaimed task");
            }
        }
    }
}
