/// 缓存数据模型
/// 定义缓存数据的结构体

// 统计缓存模型
pub mod analytics;

// 进程内缓存条目
pub mod entry;

// 限流模型
pub mod rate_limit;

// 重新导出常用类型
pub use analytics::{
    DashboardStats, PageActivity, PostStats, PostSummary, RealtimeStats, ReferrerCount, SiteStats,
    TimeRange,
};
pub use entry::CacheEntry;
pub use rate_limit::{Backend, RateLimitDecision, RateLimitEntry};
