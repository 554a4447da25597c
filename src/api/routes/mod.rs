//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Task submission and status reads
//! - [`system`] - Health and OpenAPI spec

use crate::types::{BatchSummary, Item, ItemOutcome, Task, TaskId, TaskKind, TaskStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use tasks::*;

// ============================================================================
// Response Types
// ============================================================================

/// Response for GET /api/download/:task_id
///
/// `result` is present only for completed tasks, `error` only for failed
/// ones; queued and in-progress tasks report just the status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskReport {
    /// The task id
    pub task_id: TaskId,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Download result, set once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    /// Failure message, set when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result payload of a completed task
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum TaskResult {
    /// Single-video tasks report the outcome directly
    Single(ItemOutcome),
    /// Batch tasks report per-item outcomes in index order plus a summary
    Batch {
        /// Per-item outcomes, index order
        items: Vec<ItemReport>,
        /// Aggregate counts over the batch
        summary: BatchSummary,
    },
}

/// One item's outcome within a batch report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemReport {
    /// Position in the submitted batch
    pub index: usize,
    /// The item's terminal status
    pub status: TaskStatus,
    /// Download result, set when the item completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ItemOutcome>,
    /// Failure message, set when the item failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskReport {
    /// Project a stored task record into its API report shape
    pub fn from_task(task: &Task) -> Self {
        let result = match (task.status, task.kind) {
            (TaskStatus::Completed, TaskKind::Single) => task
                .items
                .first()
                .and_then(|item| item.outcome.clone())
                .map(TaskResult::Single),
            (TaskStatus::Completed, TaskKind::Batch) => Some(TaskResult::Batch {
                items: task.items.iter().map(ItemReport::from_item).collect(),
                summary: task.summary(),
            }),
            _ => None,
        };

        let error = match task.status {
            TaskStatus::Failed => Some(
                task.error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            _ => None,
        };

        Self {
            task_id: task.id,
            status: task.status,
            result,
            error,
        }
    }
}

impl ItemReport {
    fn from_item(item: &Item) -> Self {
        Self {
            index: item.index,
            status: item.status,
            result: item.outcome.clone(),
            error: item.error.clone(),
        }
    }
}
