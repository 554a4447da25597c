//! Core types and events for tube-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for a download task
///
/// Opaque, generated exactly once when the task record is created, and
/// immutable for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub uuid::Uuid);

impl TaskId {
    /// Generate a fresh task id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

/// Requested output container/format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Video (MP4 container)
    Mp4,
    /// Audio only (MP3/M4A audio stream)
    Mp3,
}

impl MediaFormat {
    /// Canonical lowercase name ("mp4" / "mp3")
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mp3 => "mp3",
        }
    }

    /// File extension for the final output, including the dot
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => ".mp4",
            MediaFormat::Mp3 => ".mp3",
        }
    }

    /// Parse a user-supplied format string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mp4" => Some(MediaFormat::Mp4),
            "mp3" => Some(MediaFormat::Mp3),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a task tracks one video or an ordered batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// One video
    Single,
    /// Ordered sequence of videos, reported under one task id
    Batch,
}

/// Lifecycle status of a task or item
///
/// Transitions are monotonic: `Queued -> InProgress -> {Completed, Failed}`.
/// The [`crate::store::TaskStore`] rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted, waiting for a worker
    Queued,
    /// Claimed by a worker, executing
    InProgress,
    /// Terminal: processing finished (per-item outcomes may still include failures)
    Completed,
    /// Terminal: the task as a whole failed
    Failed,
}

impl TaskStatus {
    /// Canonical snake_case name, matching the wire format
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// True for `Completed` and `Failed` — the states eligible for eviction
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated download parameters for one video
///
/// Produced by the submission gateway; by the time one of these exists the
/// URL has passed YouTube/playlist checks, the format is known, the quality
/// string is normalized, and the folder has passed its writability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemSpec {
    /// The video URL
    pub video_link: String,
    /// Output format
    pub format: MediaFormat,
    /// Normalized quality string ("720p", "128kbps")
    pub quality: String,
    /// Target folder (exists and writable at submission time)
    pub folder: PathBuf,
    /// Optional user-chosen filename stem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result metadata for one successfully downloaded item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemOutcome {
    /// Final filename stem
    pub name: String,
    /// Output format
    pub format: MediaFormat,
    /// The quality the caller asked for (normalized)
    pub requested_quality: String,
    /// The quality actually delivered ("720p", "160kbps")
    pub actual_quality: String,
    /// Absolute path of the written file
    pub save_path: PathBuf,
    /// Whether separate audio/video streams were merged by the multiplexer
    pub merge: bool,
}

/// One video's work unit within a task
///
/// `index` is the position in the submitted batch (0 for single tasks) and
/// fixes the ordering of reported results regardless of execution order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Item {
    /// Position in the batch (0 for single tasks)
    pub index: usize,
    /// Validated download parameters
    pub spec: ItemSpec,
    /// Item status, mutated only by the worker executing this item
    pub status: TaskStatus,
    /// Failure message, set when status is Failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Download result, set when status is Completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ItemOutcome>,
}

impl Item {
    /// A fresh queued item for the given batch position
    pub fn new(index: usize, spec: ItemSpec) -> Self {
        Self {
            index,
            spec,
            status: TaskStatus::Queued,
            error: None,
            outcome: None,
        }
    }
}

/// Aggregate outcome counts for a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    /// Number of items in the batch
    pub total: usize,
    /// Items that completed successfully
    pub completed: usize,
    /// Items that failed
    pub failed: usize,
}

/// A tracked unit of work: one video or an ordered batch
///
/// Records are owned by the [`crate::store::TaskStore`]; reads hand out
/// clones so callers never observe a half-written record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Opaque task identifier
    pub id: TaskId,
    /// Single or batch
    pub kind: TaskKind,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp (UTC)
    pub updated_at: DateTime<Utc>,
    /// Set when the task reaches a terminal status; drives retention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// The work units; length is fixed at creation
    pub items: Vec<Item>,
    /// Task-level failure message (single tasks and dispatch failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Summary counted over the items' terminal statuses
    pub fn summary(&self) -> BatchSummary {
        let completed = self
            .items
            .iter()
            .filter(|i| i.status == TaskStatus::Completed)
            .count();
        let failed = self
            .items
            .iter()
            .filter(|i| i.status == TaskStatus::Failed)
            .count();
        BatchSummary {
            total: self.items.len(),
            completed,
            failed,
        }
    }
}

/// Per-status task counts for the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskCounts {
    /// Tasks waiting for a worker
    pub queued: usize,
    /// Tasks currently executing
    pub in_progress: usize,
    /// Tasks that finished processing
    pub completed: usize,
    /// Tasks that failed
    pub failed: usize,
    /// All tracked tasks
    pub total: usize,
}

/// Read-only health snapshot: task counts plus static configuration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// Always "ok" when the process can answer at all
    pub status: String,
    /// Task counts by status
    pub task_counts: TaskCounts,
    /// How long terminal tasks are retained before eviction
    pub task_retention_minutes: u64,
    /// How often the cleanup sweep wakes
    pub task_cleanup_interval_seconds: u64,
    /// Size of the worker pool
    pub workers: usize,
    /// Name of the active extraction backend
    pub extractor: String,
    /// Whether a multiplexer binary is available for high-quality merges
    pub muxer_available: bool,
}

/// Acknowledgement returned by the submission gateway
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitReceipt {
    /// The newly issued task id
    pub task_id: TaskId,
    /// Always `Queued` at acceptance time
    pub status: TaskStatus,
    /// Number of videos, present for batch submissions only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_count: Option<usize>,
}

/// Events emitted on the broadcast channel
///
/// Consumers subscribe via [`crate::TubeDownloader::subscribe`]. Events are
/// advisory; dropping them (no subscribers, lagging subscriber) never
/// affects task processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task was accepted and queued
    TaskQueued {
        /// The task id
        id: TaskId,
        /// Number of items
        items: usize,
    },
    /// A worker claimed the task
    TaskStarted {
        /// The task id
        id: TaskId,
    },
    /// One item finished successfully
    ItemCompleted {
        /// The parent task id
        id: TaskId,
        /// The item's batch index
        index: usize,
    },
    /// One item failed (siblings keep running)
    ItemFailed {
        /// The parent task id
        id: TaskId,
        /// The item's batch index
        index: usize,
        /// Failure message
        error: String,
    },
    /// The task finished processing
    TaskCompleted {
        /// The task id
        id: TaskId,
    },
    /// The task failed as a whole
    TaskFailed {
        /// The task id
        id: TaskId,
        /// Failure message
        error: String,
    },
    /// The cleanup sweep evicted an aged-out terminal task
    TaskEvicted {
        /// The task id
        id: TaskId,
    },
    /// Graceful shutdown initiated
    Shutdown,
}
