//! SharedStore port - 共有 KV / リストストア（Redis または InMemory）
//!
//! tracker と snapshot reader の状態はすべてここに置きます。
//! プロセス内には何も持たないので、web 層が再起動しても状態は残ります。
//!
//! # 前提とする原子性
//! - 単一キーの get / set / set_if_absent は原子的
//! - 単一リストの push / remove / range / trim は原子的
//! - 複数キーにまたがるトランザクションは要求しない

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::StoreResult;

/// SharedStore は blob 用のキーとリストを提供する外部ストア
///
/// Lists are ordered with index 0 at the head; `list_push_front` makes a
/// member the newest entry.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Fetch a blob. `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Fetch several blobs; the result is positional with `keys`.
    ///
    /// Backends with a multi-get (Redis `MGET`) should override this so a
    /// batch costs one round trip.
    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Replace a blob. `ttl = None` keeps it until deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Write only if the key does not exist. Returns `true` when written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> StoreResult<bool>;

    /// Remove a blob. Returns `true` if something was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Push `member` onto the head of the list at `key`.
    async fn list_push_front(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Remove every occurrence of `member`. Returns the number removed.
    async fn list_remove(&self, key: &str, member: &str) -> StoreResult<usize>;

    /// Up to `count` members starting from the head.
    async fn list_range(&self, key: &str, count: usize) -> StoreResult<Vec<String>>;

    /// Every member from position `start` (0-based from the head) to the tail.
    async fn list_tail(&self, key: &str, start: usize) -> StoreResult<Vec<String>>;

    /// Keep only the first `max_len` members.
    async fn list_trim(&self, key: &str, max_len: usize) -> StoreResult<()>;

    async fn list_len(&self, key: &str) -> StoreResult<usize>;

    /// Name of the backend, for logs.
    fn backend_name(&self) -> &'static str;
}
