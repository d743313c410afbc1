//! Status - 管理画面向けのレポート
//!
//! HTTP 層は持たず、管理画面が描画するデータの形だけを組み立てます。
//! スナップショット未公開や空リストは「空だが正しいビュー」として返し、
//! エラーページにはしません。ストア障害だけは呼び出し側へ伝播します。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::retry::ReadRetry;
use super::snapshot::SnapshotReader;
use super::tracker::TaskTracker;
use crate::domain::{QueryId, Stage, TrackerResult};

pub const DEFAULT_LIMIT: i64 = 50;

/// Per-stage retrieval limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListLimits {
    pub waiting: i64,
    pub in_progress: i64,
    pub done: i64,
}

impl TaskListLimits {
    /// Global `limit` defaults to 50; each stage limit falls back to it.
    pub fn resolve(
        limit: Option<i64>,
        waiting_limit: Option<i64>,
        progress_limit: Option<i64>,
        done_limit: Option<i64>,
    ) -> Self {
        let global = limit.unwrap_or(DEFAULT_LIMIT);
        Self {
            waiting: waiting_limit.unwrap_or(global),
            in_progress: progress_limit.unwrap_or(global),
            done: done_limit.unwrap_or(global),
        }
    }

    pub fn for_stage(&self, stage: Stage) -> i64 {
        match stage {
            Stage::Waiting => self.waiting,
            Stage::InProgress => self.in_progress,
            Stage::Done => self.done,
        }
    }
}

impl Default for TaskListLimits {
    fn default() -> Self {
        Self::resolve(None, None, None, None)
    }
}

/// Executor payloads of the most recent tasks per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub waiting: Vec<serde_json::Value>,
    pub in_progress: Vec<serde_json::Value>,
    pub done: Vec<serde_json::Value>,
}

/// Outdated query ids plus the time they were computed.
///
/// `updated_at` is `None` while no snapshot has been published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutdatedReport {
    pub query_ids: Vec<QueryId>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct StatusReporter {
    tracker: TaskTracker,
    snapshot: SnapshotReader,
    retry: ReadRetry,
}

impl StatusReporter {
    pub fn new(tracker: TaskTracker, snapshot: SnapshotReader) -> Self {
        let retry = ReadRetry::from_config(&tracker.config().read_retry);
        Self {
            tracker,
            snapshot,
            retry,
        }
    }

    pub fn with_retry(mut self, retry: ReadRetry) -> Self {
        self.retry = retry;
        self
    }

    pub async fn tasks(&self, limits: TaskListLimits) -> TrackerResult<TaskReport> {
        let mut report = TaskReport::default();
        for stage in Stage::ALL {
            let limit = limits.for_stage(stage);
            let records = self
                .retry
                .run(|| self.tracker.list(stage, limit))
                .await?;
            let payloads = records.into_iter().map(|r| r.data).collect();
            match stage {
                Stage::Waiting => report.waiting = payloads,
                Stage::InProgress => report.in_progress = payloads,
                Stage::Done => report.done = payloads,
            }
        }
        Ok(report)
    }

    pub async fn outdated(&self) -> TrackerResult<OutdatedReport> {
        let snapshot = self.retry.run(|| self.snapshot.read_or_empty()).await?;
        Ok(snapshot
            .map(|s| OutdatedReport {
                query_ids: s.query_ids.into_iter().collect(),
                updated_at: Some(s.last_refresh_at),
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::snapshot::SnapshotPublisher;
    use crate::config::TrackerConfig;
    use crate::domain::TaskId;
    use crate::impls::InMemoryStore;
    use crate::ports::SystemClock;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (StatusReporter, TaskTracker, SnapshotPublisher, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let config = TrackerConfig::default();
        let tracker = TaskTracker::new(store.clone(), Arc::new(SystemClock), config.clone());
        let reporter = StatusReporter::new(
            tracker.clone(),
            SnapshotReader::new(store.clone(), &config),
        )
        .with_retry(ReadRetry::none());
        let publisher = SnapshotPublisher::new(store.clone(), &config);
        (reporter, tracker, publisher, store)
    }

    #[rstest]
    #[case::all_default((None, None, None, None), (50, 50, 50))]
    #[case::global_only((Some(10), None, None, None), (10, 10, 10))]
    #[case::overrides((Some(10), Some(1), None, Some(99)), (1, 10, 99))]
    #[case::override_without_global((None, None, Some(5), None), (50, 5, 50))]
    fn limits_fall_back_to_global(
        #[case] input: (Option<i64>, Option<i64>, Option<i64>, Option<i64>),
        #[case] expected: (i64, i64, i64),
    ) {
        let limits = TaskListLimits::resolve(input.0, input.1, input.2, input.3);
        assert_eq!((limits.waiting, limits.in_progress, limits.done), expected);
    }

    #[tokio::test]
    async fn empty_store_renders_empty_views() {
        let (reporter, _, _, _) = setup();

        let tasks = reporter.tasks(TaskListLimits::default()).await.unwrap();
        assert_eq!(tasks, TaskReport::default());

        let outdated = reporter.outdated().await.unwrap();
        assert!(outdated.query_ids.is_empty());
        assert!(outdated.updated_at.is_none());
    }

    #[tokio::test]
    async fn task_report_returns_payloads_per_stage() {
        let (reporter, tracker, _, _) = setup();
        for id in ["a", "b", "c"] {
            tracker
                .register(TaskId::new(id), QueryId::new("q"), json!({"id": id}))
                .await
                .unwrap();
        }
        tracker.transition(&TaskId::new("a"), Stage::InProgress).await.unwrap();
        tracker.transition(&TaskId::new("b"), Stage::Done).await.unwrap();

        let report = reporter
            .tasks(TaskListLimits::resolve(None, Some(0), None, None))
            .await
            .unwrap();
        assert!(report.waiting.is_empty());
        assert_eq!(report.in_progress, vec![json!({"id": "a"})]);
        assert_eq!(report.done, vec![json!({"id": "b"})]);
    }

    #[tokio::test]
    async fn outdated_report_reflects_snapshot() {
        let (reporter, _, publisher, _) = setup();
        let at = Utc.timestamp_opt(100, 0).unwrap();
        publisher
            .publish(vec![QueryId::new("q2"), QueryId::new("q1")], at)
            .await
            .unwrap();

        let report = reporter.outdated().await.unwrap();
        assert_eq!(report.query_ids, vec![QueryId::new("q1"), QueryId::new("q2")]);
        assert_eq!(report.updated_at, Some(at));
    }

    #[tokio::test]
    async fn store_outage_is_an_error_not_an_empty_view() {
        let (reporter, _, _, store) = setup();
        store.set_available(false);
        assert!(reporter.tasks(TaskListLimits::default()).await.is_err());
        assert!(reporter.outdated().await.is_err());
    }
}
