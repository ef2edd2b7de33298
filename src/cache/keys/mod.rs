/// 缓存键模块
/// 提供各种缓存键生成函数

// 限流键模块
pub mod rate_limit_keys;

// 统计缓存键模块
pub mod analytics_keys;

pub use analytics_keys::{REALTIME_KEY, dashboard_key, post_stats_key, site_stats_key};
pub use rate_limit_keys::rate_limit_key;
