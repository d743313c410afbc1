//! TaskTracker - タスクのライフサイクル追跡
//!
//! ステージごとに 1 本のインデックスリスト（task_id のみ）と、
//! タスクごとに 1 つのレコードキーを持ちます。
//!
//! # 書き込み（transition）
//! 1. レコードを読み、ステージとタイムスタンプを更新して書き戻す
//! 2. 旧ステージのリストから task_id を外す
//! 3. 新ステージのリストの先頭に積み、上限で切り詰める
//!
//! 各ステップは単一キー操作で、全体はトランザクションではありません。
//! 途中の状態を `list` が見ても穴（hole）として読み飛ばされます。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::codec;
use crate::config::TrackerConfig;
use crate::domain::{
    QueryId, Stage, StoreError, StoreResult, TaskId, TaskRecord, TrackerError, TrackerResult,
};
use crate::observability::StageCounts;
use crate::ports::{Clock, SharedStore};

/// Run one store call under `timeout`. Expiry is `StoreUnavailable`.
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> TrackerResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(TrackerError::from),
        Err(_) => Err(StoreError::Timeout(timeout).into()),
    }
}

/// Registry of in-flight tasks partitioned by stage.
///
/// Cheap to clone; every clone talks to the same store.
#[derive(Clone)]
pub struct TaskTracker {
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

impl TaskTracker {
    pub fn new(store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>, config: TrackerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    async fn call<T>(&self, call: impl Future<Output = StoreResult<T>>) -> TrackerResult<T> {
        with_timeout(self.config.store_timeout(), call).await
    }

    /// Create a `Waiting` record for a newly queued task.
    pub async fn register(
        &self,
        task_id: TaskId,
        query_id: QueryId,
        data: Value,
    ) -> TrackerResult<TaskRecord> {
        let record = TaskRecord::new(task_id, query_id, data, self.clock.now());
        let key = self.config.record_key(record.task_id.as_str());
        let raw = codec::encode(&record)?;

        let written = self
            .call(
                self.store
                    .set_if_absent(&key, &raw, self.config.record_ttl()),
            )
            .await?;
        if !written {
            warn!(task_id = %record.task_id, "register on an already tracked task");
            return Err(TrackerError::DuplicateTask(record.task_id));
        }

        self.index(Stage::Waiting, &record.task_id).await?;
        debug!(
            task_id = %record.task_id,
            query_id = %record.query_id,
            "Task registered"
        );
        Ok(record)
    }

    /// Move a tracked task to `stage`.
    pub async fn transition(&self, task_id: &TaskId, stage: Stage) -> TrackerResult<TaskRecord> {
        let Some(mut record) = self.load(task_id).await? else {
            warn!(task_id = %task_id, stage = %stage, "transition on an unknown task");
            return Err(TrackerError::UnknownTask(task_id.clone()));
        };

        let from = record.stage;
        record.move_to(stage, self.clock.now());
        self.save(&record).await?;

        if from != stage {
            self.call(
                self.store
                    .list_remove(&self.config.stage_key(from), task_id.as_str()),
            )
            .await?;
        }
        self.index(stage, task_id).await?;

        debug!(task_id = %task_id, from = %from, to = %stage, "Task transitioned");
        Ok(record)
    }

    /// Most recently transitioned records in `stage`, newest first.
    ///
    /// Holes (expired, evicted, undecodable or moved-on records) are skipped,
    /// so the result can be shorter than `limit`.
    pub async fn list(&self, stage: Stage, limit: i64) -> TrackerResult<Vec<TaskRecord>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let count = usize::try_from(limit).unwrap_or(usize::MAX);
        let ids = self
            .call(self.store.list_range(&self.config.stage_key(stage), count))
            .await?;

        let records = self.load_indexed(stage, &ids).await?;
        Ok(records.into_iter().flatten().collect())
    }

    /// Remove a task from every stage index and drop its record. Idempotent.
    pub async fn evict(&self, task_id: &TaskId) -> TrackerResult<()> {
        let key = self.config.record_key(task_id.as_str());
        let existed = self.call(self.store.delete(&key)).await?;
        for stage in Stage::ALL {
            self.call(
                self.store
                    .list_remove(&self.config.stage_key(stage), task_id.as_str()),
            )
            .await?;
        }
        debug!(task_id = %task_id, existed, "Task evicted");
        Ok(())
    }

    /// Point lookup. A malformed record reads as absent.
    pub async fn get(&self, task_id: &TaskId) -> TrackerResult<Option<TaskRecord>> {
        match self.load(task_id).await {
            Err(TrackerError::MalformedRecord(reason)) => {
                warn!(task_id = %task_id, %reason, "Skipping malformed task record");
                Ok(None)
            }
            other => other,
        }
    }

    /// Shallow-merge executor metadata into the record's `data`.
    pub async fn update_data(
        &self,
        task_id: &TaskId,
        patch: Map<String, Value>,
    ) -> TrackerResult<TaskRecord> {
        let Some(mut record) = self.load(task_id).await? else {
            return Err(TrackerError::UnknownTask(task_id.clone()));
        };
        record.merge_data(patch);
        self.save(&record).await?;
        Ok(record)
    }

    /// Length of each stage index. Holes are counted, so this is an upper bound.
    pub async fn counts(&self) -> TrackerResult<StageCounts> {
        let mut counts = StageCounts::default();
        for stage in Stage::ALL {
            let len = self
                .call(self.store.list_len(&self.config.stage_key(stage)))
                .await?;
            counts.set(stage, len);
        }
        debug!(total = counts.total(), "Stage counts read");
        Ok(counts)
    }

    /// Keep the newest `keep` entries of `stage`, evicting the tasks beyond.
    ///
    /// Returns the number of tasks evicted. Index entries pointing at records
    /// that now live in another stage are only unlinked.
    pub async fn prune(&self, stage: Stage, keep: usize) -> TrackerResult<usize> {
        let stage_key = self.config.stage_key(stage);
        let overflow = self.call(self.store.list_tail(&stage_key, keep)).await?;
        if overflow.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = overflow
            .iter()
            .map(|id| self.config.record_key(id))
            .collect();
        let raws = self.call(self.store.get_many(&keys)).await?;

        let mut evicted = 0;
        for (id, raw) in overflow.iter().zip(raws) {
            let task_id = TaskId::new(id.as_str());
            let belongs_here = raw
                .as_deref()
                .and_then(|raw| codec::decode(raw).ok())
                .is_some_and(|record| record.stage == stage);
            if belongs_here {
                self.evict(&task_id).await?;
                evicted += 1;
            } else {
                self.call(self.store.list_remove(&stage_key, id)).await?;
            }
        }
        self.call(self.store.list_trim(&stage_key, keep)).await?;

        if evicted > 0 {
            debug!(stage = %stage, keep, evicted, "Stage pruned");
        }
        Ok(evicted)
    }

    /// Unlink index entries of `stage` that no longer resolve to a record in
    /// that stage. Malformed records are evicted outright.
    pub async fn remove_holes(&self, stage: Stage) -> TrackerResult<usize> {
        let ids = self.all_ids(stage).await?;
        let keys: Vec<String> = ids.iter().map(|id| self.config.record_key(id)).collect();
        let raws = self.call(self.store.get_many(&keys)).await?;

        let stage_key = self.config.stage_key(stage);
        let mut removed = 0;
        for (id, raw) in ids.iter().zip(raws) {
            match raw.as_deref().map(codec::decode) {
                Some(Ok(record)) if record.stage == stage => continue,
                Some(Err(_)) => self.evict(&TaskId::new(id.as_str())).await?,
                _ => {
                    self.call(self.store.list_remove(&stage_key, id)).await?;
                }
            }
            removed += 1;
        }
        if removed > 0 {
            debug!(stage = %stage, removed, "Removed dangling index entries");
        }
        Ok(removed)
    }

    async fn all_ids(&self, stage: Stage) -> TrackerResult<Vec<String>> {
        let key = self.config.stage_key(stage);
        let len = self.call(self.store.list_len(&key)).await?;
        if len == 0 {
            return Ok(Vec::new());
        }
        self.call(self.store.list_range(&key, len)).await
    }

    /// Unlink `task_id` from `stage` (if present) and push it on the head.
    ///
    /// Tasks pushed past `max_list_len` are evicted, record included, so no
    /// record outlives its last index entry.
    async fn index(&self, stage: Stage, task_id: &TaskId) -> TrackerResult<()> {
        let key = self.config.stage_key(stage);
        self.call(self.store.list_remove(&key, task_id.as_str()))
            .await?;
        self.call(self.store.list_push_front(&key, task_id.as_str()))
            .await?;
        self.prune(stage, self.config.max_list_len).await?;
        Ok(())
    }

    async fn load(&self, task_id: &TaskId) -> TrackerResult<Option<TaskRecord>> {
        let key = self.config.record_key(task_id.as_str());
        let raw = self.call(self.store.get(&key)).await?;
        raw.as_deref().map(codec::decode).transpose()
    }

    async fn save(&self, record: &TaskRecord) -> TrackerResult<()> {
        let key = self.config.record_key(record.task_id.as_str());
        let raw = codec::encode(record)?;
        self.call(self.store.set(&key, &raw, self.config.record_ttl()))
            .await
    }

    /// Resolve indexed ids to records, positional with `ids`; holes are `None`.
    async fn load_indexed(
        &self,
        stage: Stage,
        ids: &[String],
    ) -> TrackerResult<Vec<Option<TaskRecord>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| self.config.record_key(id)).collect();
        let raws = self.call(self.store.get_many(&keys)).await?;

        Ok(ids
            .iter()
            .zip(raws)
            .map(|(id, raw)| {
                let Some(raw) = raw else {
                    debug!(task_id = %id, stage = %stage, "Skipping expired task");
                    return None;
                };
                match codec::decode(&raw) {
                    Ok(record) if record.stage == stage => Some(record),
                    Ok(record) => {
                        debug!(
                            task_id = %id,
                            listed = %stage,
                            actual = %record.stage,
                            "Skipping task that moved on"
                        );
                        None
                    }
                    Err(e) => {
                        warn!(task_id = %id, error = %e, "Skipping malformed task record");
                        None
                    }
                }
            })
            .collect())
    }
}
