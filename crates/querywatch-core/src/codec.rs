//! Codec - TaskRecord / StalenessSnapshot とストア上の文字列表現の相互変換
//!
//! どちらも JSON です。スナップショットは `version` 付きの単一ドキュメントとして
//! 保存し、id 集合と更新時刻が必ず一緒に置き換わるようにします。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::{QueryId, StalenessSnapshot, TaskRecord, TrackerError, TrackerResult};

/// Current format version of the stored snapshot document.
pub const SNAPSHOT_VERSION: u32 = 1;

pub fn encode(record: &TaskRecord) -> TrackerResult<String> {
    serde_json::to_string(record).map_err(|source| TrackerError::Encode {
        what: "task record",
        source,
    })
}

/// Decode a stored record. Corrupt or truncated input is `MalformedRecord`.
pub fn decode(raw: &str) -> TrackerResult<TaskRecord> {
    serde_json::from_str(raw).map_err(|e| TrackerError::MalformedRecord(e.to_string()))
}

#[derive(Serialize)]
struct SnapshotDocRef<'a> {
    version: u32,
    query_ids: &'a BTreeSet<QueryId>,
    last_refresh_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SnapshotDoc {
    version: u32,
    query_ids: BTreeSet<QueryId>,
    last_refresh_at: DateTime<Utc>,
}

pub fn encode_snapshot(snapshot: &StalenessSnapshot) -> TrackerResult<String> {
    let doc = SnapshotDocRef {
        version: SNAPSHOT_VERSION,
        query_ids: &snapshot.query_ids,
        last_refresh_at: snapshot.last_refresh_at,
    };
    serde_json::to_string(&doc).map_err(|source| TrackerError::Encode {
        what: "staleness snapshot",
        source,
    })
}

pub fn decode_snapshot(raw: &str) -> TrackerResult<StalenessSnapshot> {
    let doc: SnapshotDoc =
        serde_json::from_str(raw).map_err(|e| TrackerError::MalformedRecord(e.to_string()))?;
    if doc.version != SNAPSHOT_VERSION {
        return Err(TrackerError::MalformedRecord(format!(
            "unsupported snapshot version {}",
            doc.version
        )));
    }
    Ok(StalenessSnapshot {
        query_ids: doc.query_ids,
        last_refresh_at: doc.last_refresh_at,
    })
}
