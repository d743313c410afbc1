//! InMemoryStore - 開発・テスト用の共有ストア
//!
//! Redis のキー TTL とリスト操作を最小限まねたものです。
//! 期限切れは読み取り時に判定するので、Clock を差し替えれば
//! テストから eviction を再現できます。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{StoreError, StoreResult};
use crate::ports::{Clock, SharedStore, SystemClock};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    blobs: HashMap<String, Entry>,
    lists: HashMap<String, VecDeque<String>>,
}

impl InMemoryState {
    /// Drop `key` if it has expired and return the live entry, if any.
    fn live_entry(&mut self, key: &str, now: DateTime<Utc>) -> Option<&Entry> {
        let expired = self
            .blobs
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            self.blobs.remove(key);
        }
        self.blobs.get(key)
    }
}

/// InMemoryStore は開発用の SharedStore
///
/// # 実装詳細
/// - blob と list を別の HashMap で管理
/// - tokio の Mutex で排他制御（ロックを跨いだ await はしない）
/// - `set_available(false)` で障害を、`with_latency` で遅延を再現できる
pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
            clock,
            available: AtomicBool::new(true),
            latency: None,
        }
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Simulate an outage: while unavailable every operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    async fn check(&self) -> StoreResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        }
    }

    fn expiry(&self, ttl: Option<Duration>) -> StoreResult<Option<DateTime<Utc>>> {
        ttl.map(|ttl| {
            chrono::Duration::from_std(ttl)
                .map(|ttl| self.clock.now() + ttl)
                .map_err(|e| StoreError::Backend(format!("invalid ttl: {e}")))
        })
        .transpose()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check().await?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        Ok(state.live_entry(key, now).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        self.check().await?;
        let expires_at = self.expiry(ttl)?;
        let mut state = self.state.lock().await;
        state.blobs.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        self.check().await?;
        let expires_at = self.expiry(ttl)?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        if state.live_entry(key, now).is_some() {
            return Ok(false);
        }
        state.blobs.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check().await?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let existed = state.live_entry(key, now).is_some();
        state.blobs.remove(key);
        Ok(existed)
    }

    async fn list_push_front(&self, key: &str, member: &str) -> StoreResult<()> {
        self.check().await?;
        let mut state = self.state.lock().await;
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(member.to_string());
        Ok(())
    }

    async fn list_remove(&self, key: &str, member: &str) -> StoreResult<usize> {
        self.check().await?;
        let mut state = self.state.lock().await;
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(0);
        };
        let before = list.len();
        list.retain(|m| m != member);
        let removed = before - list.len();
        if list.is_empty() {
            state.lists.remove(key);
        }
        Ok(removed)
    }

    async fn list_range(&self, key: &str, count: usize) -> StoreResult<Vec<String>> {
        self.check().await?;
        let state = self.state.lock().await;
        Ok(state
            .lists
            .get(key)
            .map(|list| list.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_tail(&self, key: &str, start: usize) -> StoreResult<Vec<String>> {
        self.check().await?;
        let state = self.state.lock().await;
        Ok(state
            .lists
            .get(key)
            .map(|list| list.iter().skip(start).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_trim(&self, key: &str, max_len: usize) -> StoreResult<()> {
        self.check().await?;
        let mut state = self.state.lock().await;
        if let Some(list) = state.lists.get_mut(key) {
            list.truncate(max_len);
            if list.is_empty() {
                state.lists.remove(key);
            }
        }
        Ok(())
    }

    async fn list_len(&self, key: &str) -> StoreResult<usize> {
        self.check().await?;
        let state = self.state.lock().await;
        Ok(state.lists.get(key).map_or(0, VecDeque::len))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
