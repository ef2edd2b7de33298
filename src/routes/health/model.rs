use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;

/// 健康检查响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务器时间
    pub timestamp: i64,
    /// 持久存储是否可用，不可用时限流和缓存都在进程内进行
    pub durable_store_available: bool,
    /// 进程内限流计数条目数
    pub rate_limit_entries: usize,
    pub cache: CacheStats,
}
