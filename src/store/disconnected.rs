use async_trait::async_trait;

use super::{DurableStore, Outcome};

/// 未配置 Redis 时使用，所有调用都返回不可用，由调用方走内存存储
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedStore;

#[async_trait]
impl DurableStore for DisconnectedStore {
    fn is_available(&self) -> bool {
        false
    }

    async fn increment_with_expiry(&self, _key: &str, _window_secs: u64) -> Outcome<i64> {
        Outcome::Unavailable
    }

    async fn get(&self, _key: &str) -> Outcome<Option<String>> {
        Outcome::Unavailable
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Outcome<()> {
        Outcome::Unavailable
    }

    async fn delete(&self, _key: &str) -> Outcome<bool> {
        Outcome::Unavailable
    }

    async fn time_to_live(&self, _key: &str) -> Outcome<Option<u64>> {
        Outcome::Unavailable
    }
}
