//! Staleness snapshot reader and publisher.
//!
//! The refresher process owns the publisher; the reporting side only reads.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::tracker::with_timeout;
use crate::codec;
use crate::config::TrackerConfig;
use crate::domain::{QueryId, StalenessSnapshot, TrackerError, TrackerResult};
use crate::ports::SharedStore;

pub struct SnapshotReader {
    store: Arc<dyn SharedStore>,
    key: String,
    timeout: Duration,
}

impl SnapshotReader {
    pub fn new(store: Arc<dyn SharedStore>, config: &TrackerConfig) -> Self {
        Self {
            store,
            key: config.snapshot_key(),
            timeout: config.store_timeout(),
        }
    }

    /// Current snapshot, or `SnapshotUnavailable` if none was ever published.
    ///
    /// An undecodable document is reported the same way.
    pub async fn read(&self) -> TrackerResult<StalenessSnapshot> {
        let raw = with_timeout(self.timeout, self.store.get(&self.key)).await?;
        let Some(raw) = raw else {
            return Err(TrackerError::SnapshotUnavailable);
        };
        codec::decode_snapshot(&raw).map_err(|e| {
            warn!(key = %self.key, error = %e, "Ignoring malformed staleness snapshot");
            TrackerError::SnapshotUnavailable
        })
    }

    /// Like `read`, but "nothing published yet" is `None`.
    pub async fn read_or_empty(&self) -> TrackerResult<Option<StalenessSnapshot>> {
        match self.read().await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(TrackerError::SnapshotUnavailable) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub struct SnapshotPublisher {
    store: Arc<dyn SharedStore>,
    key: String,
    timeout: Duration,
}

impl SnapshotPublisher {
    pub fn new(store: Arc<dyn SharedStore>, config: &TrackerConfig) -> Self {
        Self {
            store,
            key: config.snapshot_key(),
            timeout: config.store_timeout(),
        }
    }

    /// Replace the snapshot as a whole with one store write.
    pub async fn publish(
        &self,
        query_ids: impl IntoIterator<Item = QueryId>,
        refresh_time: DateTime<Utc>,
    ) -> TrackerResult<StalenessSnapshot> {
        let snapshot = StalenessSnapshot::new(query_ids, refresh_time);
        let raw = codec::encode_snapshot(&snapshot)?;
        with_timeout(self.timeout, self.store.set(&self.key, &raw, None)).await?;
        debug!(
            outdated = snapshot.len(),
            last_refresh_at = %snapshot.last_refresh_at,
            "Staleness snapshot published"
        );
        Ok(snapshot)
    }
}
