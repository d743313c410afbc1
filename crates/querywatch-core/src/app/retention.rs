//! RetentionSweeper - ステージリストの定期掃除
//!
//! # フロー
//! 1. 各ステージを `max_list_len` 件に prune（超過分のタスクは evict）
//! 2. 期限切れレコードを指すだけのエントリ（穴）をリストから外す
//!
//! `max_list_len` を超えたタスクは push 時点で evict 済みなので、通常の掃除で
//! 効くのは `with_keep` でより小さく絞った場合と、穴の除去です。

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::tracker::TaskTracker;
use crate::domain::{Stage, TrackerResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: usize,
    pub holes_removed: usize,
}

pub struct RetentionSweeper {
    tracker: TaskTracker,
    keep: usize,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(tracker: TaskTracker) -> Self {
        let keep = tracker.config().max_list_len;
        let interval = tracker.config().sweep_interval();
        Self {
            tracker,
            keep,
            interval,
        }
    }

    pub fn with_keep(mut self, keep: usize) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn sweep_once(&self) -> TrackerResult<SweepReport> {
        let mut report = SweepReport::default();
        for stage in Stage::ALL {
            report.evicted += self.tracker.prune(stage, self.keep).await?;
            report.holes_removed += self.tracker.remove_holes(stage).await?;
        }
        if report != SweepReport::default() {
            info!(
                evicted = report.evicted,
                holes_removed = report.holes_removed,
                "Retention sweep finished"
            );
        }
        Ok(report)
    }

    /// Sweep on every tick until `shutdown_rx` flips to `true` (or its sender is dropped).
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.sweep_once().await {
                warn!(error = %e, "Retention sweep failed");
            }
        }
        debug!("Retention sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::domain::{QueryId, TaskId};
    use crate::impls::InMemoryStore;
    use crate::ports::{SharedStore, SystemClock};
    use serde_json::json;
    use std::sync::Arc;

    async fn seeded(store: Arc<InMemoryStore>) -> TaskTracker {
        let tracker = TaskTracker::new(store, Arc::new(SystemClock), TrackerConfig::default());
        for id in ["a", "b", "c", "d"] {
            tracker
                .register(TaskId::new(id), QueryId::new("q"), json!({}))
                .await
                .unwrap();
            tracker.transition(&TaskId::new(id), Stage::Done).await.unwrap();
        }
        tracker
    }

    #[tokio::test]
    async fn sweep_prunes_and_removes_holes() {
        let store = Arc::new(InMemoryStore::new());
        let tracker = seeded(store.clone()).await;
        store.delete("querywatch:task:d").await.unwrap();

        let report = RetentionSweeper::new(tracker.clone())
            .with_keep(3)
            .sweep_once()
            .await
            .unwrap();

        // "a" falls beyond the newest three; "d" only has a dangling index entry.
        assert_eq!(report, SweepReport { evicted: 1, holes_removed: 1 });
        let done: Vec<String> = tracker
            .list(Stage::Done, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.task_id.into_string())
            .collect();
        assert_eq!(done, vec!["c", "b"]);
        assert_eq!(tracker.counts().await.unwrap().done, 2);
    }

    #[tokio::test]
    async fn no_record_outlives_the_list_cap_without_ttl() {
        let store = Arc::new(InMemoryStore::new());
        let config = TrackerConfig {
            max_list_len: 2,
            record_ttl_secs: 0,
            ..TrackerConfig::default()
        };
        let tracker = TaskTracker::new(store.clone(), Arc::new(SystemClock), config);
        for id in ["a", "b", "c", "d"] {
            tracker
                .register(TaskId::new(id), QueryId::new("q"), json!({}))
                .await
                .unwrap();
        }

        let report = RetentionSweeper::new(tracker.clone()).sweep_once().await.unwrap();

        assert_eq!(report, SweepReport::default());
        assert_eq!(store.get("querywatch:task:a").await.unwrap(), None);
        assert_eq!(store.get("querywatch:task:b").await.unwrap(), None);
        assert!(store.get("querywatch:task:d").await.unwrap().is_some());
        assert_eq!(tracker.counts().await.unwrap().waiting, 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        let tracker = seeded(store).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = RetentionSweeper::new(tracker.clone())
            .with_keep(1)
            .with_interval(Duration::from_millis(10));
        let handle = tokio::spawn(sweeper.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(tracker.counts().await.unwrap().done, 1);
    }
}
