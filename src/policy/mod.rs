//! 限流策略与操作目录

use std::borrow::Cow;
use std::time::Duration;

use crate::cache::keys::rate_limit_key;
use crate::error::PolicyError;

mod catalog;

pub use catalog::{Gate, Identity, Operation, Scope};

/// 不可变的限流策略
///
/// 不同功能必须使用不同的命名空间，否则计数会互相干扰。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    namespace: Cow<'static, str>,
    window: Duration,
    max_requests: u32,
    skip_successful_requests: bool,
    skip_failed_requests: bool,
}

impl RateLimitPolicy {
    /// 策略属于静态配置，参数非法直接 panic
    pub fn new(namespace: impl Into<Cow<'static, str>>, window: Duration, max_requests: u32) -> Self {
        match Self::try_new(namespace, window, max_requests) {
            Ok(policy) => policy,
            Err(e) => panic!("invalid rate limit policy: {}", e),
        }
    }

    pub fn try_new(
        namespace: impl Into<Cow<'static, str>>,
        window: Duration,
        max_requests: u32,
    ) -> Result<Self, PolicyError> {
        if window.as_millis() == 0 {
            return Err(PolicyError::ZeroWindow);
        }
        if max_requests == 0 {
            return Err(PolicyError::ZeroMaxRequests);
        }
        Ok(Self {
            namespace: namespace.into(),
            window,
            max_requests,
            skip_successful_requests: false,
            skip_failed_requests: false,
        })
    }

    /// 仅作声明，由调用方决定是否在成功后调用限流
    pub fn skip_successful_requests(mut self, skip: bool) -> Self {
        self.skip_successful_requests = skip;
        self
    }

    /// 仅作声明，由调用方决定是否在失败后调用限流
    pub fn skip_failed_requests(mut self, skip: bool) -> Self {
        self.skip_failed_requests = skip;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 窗口秒数，向上取整
    pub fn window_secs(&self) -> u64 {
        u64::try_from(self.window.as_millis().div_ceil(1000)).unwrap_or(u64::MAX)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn counts_successful_requests(&self) -> bool {
        !self.skip_successful_requests
    }

    pub fn counts_failed_requests(&self) -> bool {
        !self.skip_failed_requests
    }

    pub fn key_for(&self, identifier: &str) -> String {
        rate_limit_key(&self.namespace, identifier)
    }
}
