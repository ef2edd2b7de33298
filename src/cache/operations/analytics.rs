use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::{REALTIME_KEY, dashboard_key, post_stats_key, site_stats_key};
use crate::cache::models::{DashboardStats, PostStats, RealtimeStats, SiteStats, TimeRange};
use crate::cache::operations::cache::{CacheOperations, CacheStats};

/// 仪表盘统计缓存时间
pub const DASHBOARD_TTL: Duration = Duration::from_secs(5 * 60);

/// 实时统计缓存时间
pub const REALTIME_TTL: Duration = Duration::from_secs(30);

/// 文章统计缓存时间
pub const POST_STATS_TTL: Duration = Duration::from_secs(10 * 60);

/// 全站统计缓存时间
pub const SITE_STATS_TTL: Duration = Duration::from_secs(15 * 60);

/// 统计数据缓存操作
pub struct AnalyticsCacheOperations {
    cache: Arc<CacheOperations>,
}

impl AnalyticsCacheOperations {
    pub fn new(cache: Arc<CacheOperations>) -> Self {
        Self { cache }
    }

    pub async fn get_dashboard_stats(&self, range: TimeRange) -> Option<DashboardStats> {
        self.cache.get(&dashboard_key(range)).await
    }

    pub async fn set_dashboard_stats(&self, range: TimeRange, stats: &DashboardStats) {
        self.cache.set(&dashboard_key(range), stats, DASHBOARD_TTL).await
    }

    /// 不指定范围时删除所有范围
    pub async fn invalidate_dashboard_stats(&self, range: Option<TimeRange>) -> usize {
        self.cache.invalidate(&range_keys(range, dashboard_key)).await
    }

    pub async fn get_realtime_stats(&self) -> Option<RealtimeStats> {
        self.cache.get(REALTIME_KEY).await
    }

    pub async fn set_realtime_stats(&self, stats: &RealtimeStats) {
        self.cache.set(REALTIME_KEY, stats, REALTIME_TTL).await
    }

    pub async fn invalidate_realtime_stats(&self) -> bool {
        self.cache.delete(REALTIME_KEY).await
    }

    pub async fn get_post_stats(&self, post_id: &str, range: TimeRange) -> Option<PostStats> {
        self.cache.get(&post_stats_key(post_id, range)).await
    }

    pub async fn set_post_stats(&self, post_id: &str, range: TimeRange, stats: &PostStats) {
        self.cache
            .set(&post_stats_key(post_id, range), stats, POST_STATS_TTL)
            .await
    }

    pub async fn invalidate_post_stats(&self, post_id: &str, range: Option<TimeRange>) -> usize {
        let keys = range_keys(range, |range| post_stats_key(post_id, range));
        self.cache.invalidate(&keys).await
    }

    pub async fn get_site_stats(&self, range: TimeRange) -> Option<SiteStats> {
        self.cache.get(&site_stats_key(range)).await
    }

    pub async fn set_site_stats(&self, range: TimeRange, stats: &SiteStats) {
        self.cache.set(&site_stats_key(range), stats, SITE_STATS_TTL).await
    }

    pub async fn invalidate_site_stats(&self, range: Option<TimeRange>) -> usize {
        self.cache.invalidate(&range_keys(range, site_stats_key)).await
    }

    pub fn cleanup_memory_cache(&self) -> usize {
        self.cache.cleanup_memory_cache()
    }

    pub fn get_stats(&self) -> CacheStats {
        self.cache.get_stats()
    }
}

fn range_keys(range: Option<TimeRange>, key: impl Fn(TimeRange) -> String) -> Vec<String> {
    match range {
        Some(range) => vec![key(range)],
        None => TimeRange::ALL.into_iter().map(key).collect(),
    }
}
