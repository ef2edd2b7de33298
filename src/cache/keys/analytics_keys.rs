use crate::cache::models::analytics::TimeRange;

/// 仪表盘统计缓存键前缀
const DASHBOARD_PREFIX: &str = "dashboard:";

/// 实时统计缓存键
pub const REALTIME_KEY: &str = "realtime:current";

/// 单篇文章统计缓存键前缀
const POST_STATS_PREFIX: &str = "post:";

/// 全站统计缓存键前缀
const SITE_STATS_PREFIX: &str = "site:";

/// 生成仪表盘统计缓存键
pub fn dashboard_key(range: TimeRange) -> String {
    format!("{}{}", DASHBOARD_PREFIX, range.tag())
}

/// 生成文章统计缓存键
pub fn post_stats_key(post_id: &str, range: TimeRange) -> String {
    format!("{}{}:{}", POST_STATS_PREFIX, post_id, range.tag())
}

/// 生成全站统计缓存键
pub fn site_stats_key(range: TimeRange) -> String {
    format!("{}{}", SITE_STATS_PREFIX, range.tag())
}
