//! Task record: metadata + lifecycle timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{QueryId, TaskId};
use super::stage::Stage;

/// Metadata for a tracked task.
///
/// Design:
/// - This is the "single source of truth" for a task's stage.
/// - Stage index lists hold TaskId only.
/// - All stage changes go through `move_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub query_id: QueryId,
    pub stage: Stage,

    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Executor-owned payload. Never interpreted by the tracker.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl TaskRecord {
    pub fn new(
        task_id: TaskId,
        query_id: QueryId,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            query_id,
            stage: Stage::Waiting,
            enqueued_at: now,
            started_at: None,
            finished_at: None,
            data,
        }
    }

    /// Move to `stage`, stamping the timestamp that belongs to it.
    pub fn move_to(&mut self, stage: Stage, now: DateTime<Utc>) {
        match stage {
            Stage::Waiting => self.enqueued_at = now,
            Stage::InProgress => self.started_at = Some(now),
            Stage::Done => self.finished_at = Some(now),
        }
        self.stage = stage;
    }

    /// Shallow-merge `patch` into `data`. A non-object `data` is replaced.
    pub fn merge_data(&mut self, patch: serde_json::Map<String, serde_json::Value>) {
        match &mut self.data {
            serde_json::Value::Object(map) => map.extend(patch),
            other => *other = serde_json::Value::Object(patch),
        }
    }
}
