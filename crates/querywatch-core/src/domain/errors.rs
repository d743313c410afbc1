//! Errors - エラー型と分類

use thiserror::Error;

use super::ids::TaskId;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（読み取りならリトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// Errors surfaced by the tracker and the snapshot reader.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("task {0} is already registered")]
    DuplicateTask(TaskId),

    #[error("task {0} is not tracked (never registered or already evicted)")]
    UnknownTask(TaskId),

    /// Stored data that cannot be decoded.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A value that could not be serialized for writing. Nothing is written.
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no staleness snapshot has been published yet")]
    SnapshotUnavailable,

    #[error("shared store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::StoreUnavailable(_) => ErrorKind::Transient,
            _ => ErrorKind::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Errors returned by `SharedStore` adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Unavailable(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn store_errors_are_transient() {
        let err: TrackerError = StoreError::Timeout(Duration::from_millis(500)).into();
        assert!(err.is_transient());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn domain_errors_are_permanent() {
        assert_eq!(
            TrackerError::UnknownTask(TaskId::new("ghost")).kind(),
            ErrorKind::Permanent
        );
        assert_eq!(TrackerError::SnapshotUnavailable.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn encode_failures_are_permanent() {
        let err = TrackerError::Encode {
            what: "task record",
            source: <serde_json::Error as serde::ser::Error>::custom("unsupported value"),
        };
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert_eq!(
            err.to_string(),
            "failed to encode task record: unsupported value"
        );
    }
}
