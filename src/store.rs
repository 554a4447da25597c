//! In-memory task store
//!
//! The store owns every task record behind one async mutex. All reads hand
//! out clones, so callers never hold a reference into the map and the lock
//! is never held across an await into a collaborator. Status transitions
//! are monotonic (`queued -> in_progress -> {completed, failed}`) and the
//! store is the single place that enforces them.

use crate::error::{Error, Result};
use crate::types::{
    Item, ItemOutcome, ItemSpec, Task, TaskCounts, TaskId, TaskKind, TaskStatus,
};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Shared, mutex-guarded map of task records
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Mutex<HashMap<TaskId, Task>>,
}

impl TaskStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queued task for the given items and return a snapshot
    ///
    /// Item order follows the submitted order; the task id is generated
    /// here and never changes.
    pub async fn create(&self, kind: TaskKind, specs: Vec<ItemSpec>) -> Task {
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(),
            kind,
            status: TaskStatus::Queued,
            created_at: now,
            updated_at: now,
            finished_at: None,
            items: specs
                .into_iter()
                .enumerate()
                .map(|(index, spec)| Item::new(index, spec))
                .collect(),
            error: None,
        };

        let snapshot = task.clone();
        self.tasks.lock().await.insert(task.id, task);
        snapshot
    }

    /// Snapshot of one task, if it is still tracked
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.lock().await.get(&id).cloned()
    }

    /// Atomically claim a queued task for execution
    ///
    /// The claim is the only path from `queued` to `in_progress`; a second
    /// claim for the same id fails with `InvalidTransition`, so a task can
    /// never run on two workers.
    pub async fn claim(&self, id: TaskId) -> Result<Task> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        check_transition(id, task.status, TaskStatus::InProgress)?;
        task.status = TaskStatus::InProgress;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Mark an item in progress
    pub async fn start_item(&self, id: TaskId, index: usize) -> Result<()> {
        self.update_item(id, index, |item| {
            check_transition(id, item.status, TaskStatus::InProgress)?;
            item.status = TaskStatus::InProgress;
            Ok(())
        })
        .await
    }

    /// Record a successful item outcome
    pub async fn complete_item(&self, id: TaskId, index: usize, outcome: ItemOutcome) -> Result<()> {
        self.update_item(id, index, |item| {
            check_transition(id, item.status, TaskStatus::Completed)?;
            item.status = TaskStatus::Completed;
            item.outcome = Some(outcome);
            Ok(())
        })
        .await
    }

    /// Record an item failure; sibling items are unaffected
    pub async fn fail_item(&self, id: TaskId, index: usize, error: String) -> Result<()> {
        self.update_item(id, index, |item| {
            check_transition(id, item.status, TaskStatus::Failed)?;
            item.status = TaskStatus::Failed;
            item.error = Some(error);
            Ok(())
        })
        .await
    }

    /// Move a task to `completed` and stamp `finished_at`
    pub async fn complete_task(&self, id: TaskId) -> Result<Task> {
        self.finish(id, TaskStatus::Completed, None).await
    }

    /// Move a task to `failed` with a message and stamp `finished_at`
    pub async fn fail_task(&self, id: TaskId, error: String) -> Result<Task> {
        self.finish(id, TaskStatus::Failed, Some(error)).await
    }

    /// Task counts by status, for the health report
    pub async fn counts(&self) -> TaskCounts {
        let tasks = self.tasks.lock().await;
        let mut counts = TaskCounts::default();
        for task in tasks.values() {
            match task.status {
                TaskStatus::Queued => counts.queued += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts.total = tasks.len();
        counts
    }

    /// Evict terminal tasks whose `finished_at` is older than `retention`
    ///
    /// Queued and in-progress tasks are never touched, whatever their age.
    /// Returns the evicted ids so the sweep can log and emit events.
    pub async fn evict_terminal_older_than(&self, retention: Duration) -> Vec<TaskId> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
        let mut tasks = self.tasks.lock().await;
        let expired: Vec<TaskId> = tasks
            .values()
            .filter(|t| {
                t.status.is_terminal() && t.finished_at.is_some_and(|at| at < cutoff)
            })
            .map(|t| t.id)
            .collect();
        for id in &expired {
            tasks.remove(id);
        }
        expired
    }

    async fn finish(&self, id: TaskId, status: TaskStatus, error: Option<String>) -> Result<Task> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        check_transition(id, task.status, status)?;
        let now = Utc::now();
        task.status = status;
        task.updated_at = now;
        task.finished_at = Some(now);
        if error.is_some() {
            task.error = error;
        }
        Ok(task.clone())
    }

    async fn update_item<F>(&self, id: TaskId, index: usize, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Item) -> Result<()>,
    {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        let item = task
            .items
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("task {id} item {index}")))?;
        mutate(item)?;
        task.updated_at = Utc::now();
        Ok(())
    }
}

/// Reject anything but queued -> in_progress and queued/in_progress -> terminal
fn check_transition(id: TaskId, from: TaskStatus, to: TaskStatus) -> Result<()> {
    let allowed = matches!(
        (from, to),
        (TaskStatus::Queued, TaskStatus::InProgress)
            | (TaskStatus::Queued, TaskStatus::Failed)
            | (TaskStatus::InProgress, TaskStatus::Completed)
            | (TaskStatus::InProgress, TaskStatus::Failed)
    );
    if allowed {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
