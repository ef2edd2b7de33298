use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::models::CacheEntry;
use crate::cache::models::rate_limit::window_delta;
use crate::clock::Clock;
use crate::store::{DurableStore, Outcome};

/// 缓存状态，供健康检查使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub memory_entry_count: usize,
    pub durable_store_available: bool,
}

/// 通用读穿缓存
///
/// 先读写持久存储（JSON 文本），不可用时使用进程内的表并自行记录过期时间。
/// 序列化失败在读取时视为未命中，写入时记录日志后跳过，缓存出错不能影响业务本身。
pub struct CacheOperations {
    durable: Arc<dyn DurableStore>,
    memory: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl CacheOperations {
    pub fn new(durable: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            durable,
            memory: DashMap::new(),
            clock,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = self.read(key).await?;
        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "cached value could not be decoded, treating as miss");
                None
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "value could not be encoded, skipping cache write");
                return;
            }
        };

        if self.durable.is_available() {
            let ttl_secs = u64::try_from(ttl.as_millis().div_ceil(1000))
                .unwrap_or(u64::MAX)
                .max(1);
            match self.durable.set(key, &payload, ttl_secs).await {
                Outcome::Ok(()) => {
                    // 持久存储写入成功后，降级期间留下的旧副本不再需要
                    self.memory.remove(key);
                    return;
                }
                Outcome::Unavailable => {}
                Outcome::Error(e) => warn!(key, error = %e, "durable cache write failed"),
            }
        }

        let entry = CacheEntry::new(payload, self.clock.now(), window_delta(ttl));
        self.memory.insert(key.to_string(), entry);
    }

    /// 两个后端都删除，返回是否删除了内容
    pub async fn delete(&self, key: &str) -> bool {
        let mut removed = false;
        if self.durable.is_available() {
            match self.durable.delete(key).await {
                Outcome::Ok(deleted) => removed = deleted,
                Outcome::Unavailable => {}
                Outcome::Error(e) => warn!(key, error = %e, "durable cache delete failed"),
            }
        }
        self.memory.remove(key).is_some() || removed
    }

    /// 逐个删除给定的键，返回删除数量
    pub async fn invalidate(&self, keys: &[String]) -> usize {
        let mut removed = 0;
        for key in keys {
            if self.delete(key).await {
                removed += 1;
            }
        }
        removed
    }

    /// 命中直接返回，否则计算后写回缓存
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = compute().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// 清理进程内已过期的条目
    pub fn cleanup_memory_cache(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.memory.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    pub fn get_stats(&self) -> CacheStats {
        CacheStats {
            memory_entry_count: self.memory.len(),
            durable_store_available: self.durable.is_available(),
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        if self.durable.is_available() {
            match self.durable.get(key).await {
                Outcome::Ok(payload) => return payload,
                Outcome::Unavailable => {}
                Outcome::Error(e) => warn!(key, error = %e, "durable cache read failed"),
            }
        }

        let now = self.clock.now();
        if let Some(entry) = self.memory.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.payload.clone());
            }
        }
        self.memory.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }
}
