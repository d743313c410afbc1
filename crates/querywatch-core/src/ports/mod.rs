//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（Redis など）への境界です。
//! tracker と snapshot reader はここにある trait だけに依存し、
//! 具体的な実装は構築時に注入されます（グローバルな接続は持たない）。

pub mod clock;
pub mod id_generator;
pub mod shared_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::shared_store::SharedStore;
