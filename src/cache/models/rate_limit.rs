use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_retry_message;

/// 进程内限流计数
///
/// 窗口内计数只增不减；`now - first_request_at > window` 之后整条记录被新记录替换。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitEntry {
    pub identifier: String,
    pub count: u32,
    pub first_request_at: DateTime<Utc>,
    pub last_request_at: DateTime<Utc>,
}

impl RateLimitEntry {
    pub fn new(identifier: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            count: 1,
            first_request_at: now,
            last_request_at: now,
        }
    }

    pub fn incremented(&self, now: DateTime<Utc>) -> Self {
        Self {
            identifier: self.identifier.clone(),
            count: self.count.saturating_add(1),
            first_request_at: self.first_request_at,
            last_request_at: now,
        }
    }

    pub fn is_expired(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now - self.first_request_at > window_delta(window)
    }

    pub fn window_ends_at(&self, window: Duration) -> DateTime<Utc> {
        self.first_request_at + window_delta(window)
    }

    /// 距离窗口结束的秒数（向上取整），至少为1
    pub fn seconds_until_reset(&self, window: Duration, now: DateTime<Utc>) -> u64 {
        let remaining_ms = (self.window_ends_at(window) - now).num_milliseconds();
        u64::try_from(remaining_ms).unwrap_or(0).div_ceil(1000).max(1)
    }
}

/// 产生决策的存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Durable,
    Memory,
}

/// 一次限流检查的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    /// 允许时为0
    pub retry_after_seconds: u64,
    pub backend: Backend,
}

impl RateLimitDecision {
    /// 被拒绝时给用户看的提示
    pub fn retry_message(&self) -> Option<String> {
        (!self.allowed).then(|| format_retry_message(self.retry_after_seconds))
    }
}

pub(crate) fn window_delta(window: Duration) -> chrono::Duration {
    let millis = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    chrono::Duration::try_milliseconds(millis).unwrap_or(chrono::Duration::MAX)
}
