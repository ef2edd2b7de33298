//! 存储后端
//!
//! - [`DurableStore`]：远程持久存储（Redis）接口，不可达时返回 [`Outcome::Unavailable`]
//! - [`MemoryStore`]：进程内的限流计数降级存储

use async_trait::async_trait;

use crate::error::StoreError;

mod disconnected;
mod memory;
mod redis_store;

pub use disconnected::DisconnectedStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// 持久存储调用结果
///
/// `Unavailable` 与 `Error` 都意味着调用方应当降级，二者只在日志级别上有区别。
#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    Unavailable,
    Error(StoreError),
}

impl<T> Outcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            _ => None,
        }
    }
}

/// 远程键值存储接口
///
/// 实现必须保证 `increment_with_expiry` 的原子性，并且不能因为远端不可达而 panic。
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// 存储当前是否可用
    fn is_available(&self) -> bool;

    /// 原子地把 `key` 加一；键不存在时以 1 创建并设置 `window_secs` 过期，已存在时不重置过期时间
    async fn increment_with_expiry(&self, key: &str, window_secs: u64) -> Outcome<i64>;

    async fn get(&self, key: &str) -> Outcome<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Outcome<()>;

    /// 返回键是否真的被删除
    async fn delete(&self, key: &str) -> Outcome<bool>;

    /// 剩余存活秒数，键不存在或没有过期时间时为 `None`
    async fn time_to_live(&self, key: &str) -> Outcome<Option<u64>>;
}
