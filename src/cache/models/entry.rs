use chrono::{DateTime, Utc};

/// 进程内缓存条目，保存序列化后的文本和过期时间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub payload: String,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: String, stored_at: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            payload,
            stored_at,
            expires_at: stored_at + ttl,
        }
    }

    /// 过期后逻辑上视为不存在，不论是否已经被清理
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
