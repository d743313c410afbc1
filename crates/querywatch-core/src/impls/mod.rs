//! Implementations - ports の具体的な実装
//!
//! - **InMemoryStore**: 開発・テスト用
//! - **RedisStore**: 本番用（`redis` feature）

pub mod inmem_store;
#[cfg(feature = "redis")]
pub mod redis_store;

pub use self::inmem_store::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis_store::RedisStore;
