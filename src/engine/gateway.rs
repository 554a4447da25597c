//! Submission gateway: validate, create, enqueue.

use super::TubeDownloader;
use crate::error::{Error, Result};
use crate::types::{Event, SubmitReceipt, Task, TaskKind};
use crate::validate::{ItemRequest, validate_batch, validate_single};
use std::sync::atomic::Ordering;

impl TubeDownloader {
    /// Submit one video for download
    ///
    /// Validation runs synchronously; a task only exists once the payload
    /// is fully valid. The returned receipt carries the id to poll.
    pub async fn submit(&self, request: ItemRequest) -> Result<SubmitReceipt> {
        self.check_accepting()?;
        let spec = validate_single(&request, &self.config)?;
        let task = self.store.create(TaskKind::Single, vec![spec]).await;
        self.enqueue(task).await
    }

    /// Submit an ordered batch of videos under one task id
    ///
    /// All-or-nothing: any invalid item rejects the whole submission and
    /// no task is created.
    pub async fn submit_batch(&self, requests: Vec<ItemRequest>) -> Result<SubmitReceipt> {
        self.check_accepting()?;
        let specs = validate_batch(&requests, &self.config)?;
        let task = self.store.create(TaskKind::Batch, specs).await;
        self.enqueue(task).await
    }

    fn check_accepting(&self) -> Result<()> {
        if self.accepting_new.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    async fn enqueue(&self, task: Task) -> Result<SubmitReceipt> {
        let id = task.id;
        let items = task.items.len();

        // Blocks when the dispatch queue is at capacity, which is the
        // backpressure the gateway is supposed to exert.
        if self.work_tx.send(id).await.is_err() {
            // Channel closed mid-shutdown; the record exists, so fail it
            // rather than leaving a queued task no worker will ever claim.
            let _ = self
                .store
                .fail_task(id, "engine shutting down".to_string())
                .await;
            return Err(Error::ShuttingDown);
        }

        tracing::info!(task_id = %id, items, kind = ?task.kind, "task queued");
        self.emit_event(Event::TaskQueued { id, items });

        Ok(SubmitReceipt {
            task_id: id,
            status: task.status,
            video_count: match task.kind {
                TaskKind::Single => None,
                TaskKind::Batch => Some(items),
            },
        })
    }
}
