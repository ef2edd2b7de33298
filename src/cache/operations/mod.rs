/// 缓存操作
/// 提供缓存操作的功能实现

// 通用缓存操作
pub mod cache;

// 统计缓存操作
pub mod analytics;

// 限流操作
pub mod rate_limit;

// 重新导出常用操作
pub use analytics::AnalyticsCacheOperations;
pub use cache::{CacheOperations, CacheStats};
pub use rate_limit::RateLimiter;
