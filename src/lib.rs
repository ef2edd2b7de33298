use std::sync::Arc;

use cache::{AnalyticsCacheOperations, CacheOperations, RateLimiter};
use clock::{Clock, SystemClock};
use config::Config;
use error::ConfigError;
use policy::RateLimitPolicy;
use store::{DisconnectedStore, DurableStore, MemoryStore, RedisStore};

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod middleware;
pub mod policy;
pub mod result;
pub mod router;
pub mod routes;
pub mod store;
pub mod utils;

/// 全局按 IP 限流使用的命名空间
pub const GLOBAL_IP_NAMESPACE: &str = "global:ip";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub limiter: Arc<RateLimiter>,
    pub analytics: Arc<AnalyticsCacheOperations>,
    pub global_policy: RateLimitPolicy,
}

impl AppState {
    /// 按配置组装存储，未配置 Redis 时只使用进程内存储
    pub fn build(config: Config) -> Result<Self, ConfigError> {
        let durable: Arc<dyn DurableStore> = match &config.redis_url {
            Some(url) => Arc::new(RedisStore::open(
                url,
                config.redis_timeout(),
                config.redis_retry_interval(),
            )?),
            None => {
                tracing::warn!("REDIS_URL not set, running with in-process stores only");
                Arc::new(DisconnectedStore)
            }
        };
        Self::with_stores(config, durable, Arc::new(SystemClock))
    }

    pub fn with_stores(
        config: Config,
        durable: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let global_policy = RateLimitPolicy::try_new(
            GLOBAL_IP_NAMESPACE,
            config.rate_limit_window(),
            config.rate_limit_requests,
        )?;
        let limiter = RateLimiter::new(
            Arc::clone(&durable),
            Arc::new(MemoryStore::new()),
            Arc::clone(&clock),
        );
        let cache = CacheOperations::new(durable, clock);

        Ok(Self {
            config,
            limiter: Arc::new(limiter),
            analytics: Arc::new(AnalyticsCacheOperations::new(Arc::new(cache))),
            global_policy,
        })
    }
}
