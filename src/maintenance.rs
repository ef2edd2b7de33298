//! 定期清理任务，由 main 显式启动，核心模块自身不做调度

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::cache::{AnalyticsCacheOperations, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub rate_limit_entries: usize,
    pub cache_entries: usize,
}

/// 执行一次清理
pub fn sweep_once(
    limiter: &RateLimiter,
    analytics: &AnalyticsCacheOperations,
    window: Duration,
) -> SweepReport {
    SweepReport {
        rate_limit_entries: limiter.cleanup_expired(window),
        cache_entries: analytics.cleanup_memory_cache(),
    }
}

/// 启动后台清理任务，`window` 应不短于所有策略中最长的窗口
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    analytics: Arc<AnalyticsCacheOperations>,
    interval: Duration,
    window: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即返回
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = sweep_once(&limiter, &analytics, window);
            debug!(
                rate_limit_entries = report.rate_limit_entries,
                cache_entries = report.cache_entries,
                "periodic sweep finished"
            );
        }
    })
}
