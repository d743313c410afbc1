//! App - アプリケーション層
//!
//! ports を組み合わせて tracker とレポートのロジックを実装します。
//!
//! # 主要コンポーネント
//! - **TaskTracker**: ステージ別リスト + タスクレコードの管理
//! - **SnapshotReader / SnapshotPublisher**: 古くなったクエリの一覧
//! - **StatusReporter**: 管理画面向けのビュー
//! - **RetentionSweeper**: ステージリストの定期掃除
//! - **ReadRetry**: 読み取り用の有限リトライ

pub mod retention;
pub mod retry;
pub mod snapshot;
pub mod status;
pub mod tracker;

pub use self::retention::{RetentionSweeper, SweepReport};
pub use self::retry::ReadRetry;
pub use self::snapshot::{SnapshotPublisher, SnapshotReader};
pub use self::status::{OutdatedReport, StatusReporter, TaskListLimits, TaskReport};
pub use self::tracker::TaskTracker;
