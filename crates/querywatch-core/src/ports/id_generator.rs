//! IdGenerator port - ID 生成の抽象化
//!
//! executor が自前の ID を持たない場合に使います。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（時刻でソート可能、分散生成可能）

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::ids::{IdMarker, Task, TaskId};
use crate::ports::Clock;

/// IdGenerator は新しい TaskId を生成
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// UlidGenerator は Clock の時刻 + 乱数で ULID を作る
///
/// FixedClock を渡せばタイムスタンプ部分が決定的になります。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_task_id(&self) -> TaskId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TaskId::new(format!("{}{}", Task::prefix(), ulid))
    }
}
