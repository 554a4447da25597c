//! Per-task orchestration: claim, run items in order, finalize.

use super::TubeDownloader;
use crate::types::{Event, TaskId, TaskKind, TaskStatus};

impl TubeDownloader {
    /// Run one claimed task to a terminal state
    ///
    /// Items execute sequentially in index order; a failing item never
    /// stops its siblings. Finalization: a single task takes its item's
    /// terminal state, a batch always completes once processing finishes,
    /// whatever the per-item outcomes.
    pub(crate) async fn run_task(&self, worker: usize, id: TaskId) {
        let task = match self.store.claim(id).await {
            Ok(task) => task,
            Err(e) => {
                // Evicted or double-dispatched; nothing to run
                tracing::warn!(worker, task_id = %id, error = %e, "could not claim task");
                return;
            }
        };

        tracing::info!(worker, task_id = %id, items = task.items.len(), "task started");
        self.emit_event(Event::TaskStarted { id });

        for item in &task.items {
            if let Err(e) = self.store.start_item(id, item.index).await {
                tracing::error!(task_id = %id, index = item.index, error = %e, "could not start item");
                continue;
            }

            match self.execute_item(id, item).await {
                Ok(outcome) => {
                    tracing::info!(
                        task_id = %id,
                        index = item.index,
                        save_path = %outcome.save_path.display(),
                        actual_quality = %outcome.actual_quality,
                        merged = outcome.merge,
                        "item completed"
                    );
                    if let Err(e) = self.store.complete_item(id, item.index, outcome).await {
                        tracing::error!(task_id = %id, index = item.index, error = %e, "could not record item outcome");
                    }
                    self.emit_event(Event::ItemCompleted {
                        id,
                        index: item.index,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(task_id = %id, index = item.index, error = %message, "item failed");
                    if let Err(e) = self.store.fail_item(id, item.index, message.clone()).await {
                        tracing::error!(task_id = %id, index = item.index, error = %e, "could not record item failure");
                    }
                    self.emit_event(Event::ItemFailed {
                        id,
                        index: item.index,
                        error: message,
                    });
                }
            }
        }

        self.finalize(id, task.kind).await;
    }

    async fn finalize(&self, id: TaskId, kind: TaskKind) {
        let snapshot = match self.store.get(id).await {
            Some(task) => task,
            None => {
                tracing::error!(task_id = %id, "task vanished before finalization");
                return;
            }
        };

        let result = match kind {
            TaskKind::Single => {
                let item = &snapshot.items[0];
                if item.status == TaskStatus::Completed {
                    self.store.complete_task(id).await
                } else {
                    let message = item
                        .error
                        .clone()
                        .unwrap_or_else(|| "download failed".to_string());
                    self.store.fail_task(id, message).await
                }
            }
            // A batch completed means "processing finished"; the summary
            // reports how many items made it.
            TaskKind::Batch => self.store.complete_task(id).await,
        };

        match result {
            Ok(task) => {
                let summary = task.summary();
                tracing::info!(
                    task_id = %id,
                    status = %task.status,
                    completed = summary.completed,
                    failed = summary.failed,
                    "task finished"
                );
                match task.status {
                    TaskStatus::Failed => self.emit_event(Event::TaskFailed {
                        id,
                        error: task.error.unwrap_or_default(),
                    }),
                    _ => self.emit_event(Event::TaskCompleted { id }),
                }
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "could not finalize task");
            }
        }
    }
}
