//! querywatch-core
//!
//! Task lifecycle tracking and staleness reporting for an asynchronous
//! query-execution system.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, stage, record, snapshot, errors）
//! - **ports**: 抽象化レイヤー（SharedStore, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryStore、`redis` feature で RedisStore）
//! - **codec**: ストア上の文字列表現との変換
//! - **app**: TaskTracker, SnapshotReader, StatusReporter, RetentionSweeper
//! - **config**: TrackerConfig（ファイル + 環境変数）
//! - **observability**: tracing の初期化とステージ別件数

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use crate::app::{SnapshotPublisher, SnapshotReader, StatusReporter, TaskTracker};
pub use crate::config::TrackerConfig;
pub use crate::domain::{QueryId, Stage, StalenessSnapshot, TaskId, TaskRecord, TrackerError};
