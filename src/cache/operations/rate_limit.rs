use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::keys::rate_limit_key;
use crate::cache::models::rate_limit::window_delta;
use crate::cache::models::{Backend, RateLimitDecision};
use crate::clock::{Clock, SystemClock};
use crate::policy::{Identity, Operation, RateLimitPolicy};
use crate::store::{DisconnectedStore, DurableStore, MemoryStore, Outcome};

/// 限流器
///
/// 优先使用持久存储的原子计数；持久存储不可用或出错时透明地降级到进程内存储，
/// 基础设施故障不会导致请求被拒绝。被拒绝的请求同样计数。
pub struct RateLimiter {
    durable: Arc<dyn DurableStore>,
    memory: Arc<MemoryStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(durable: Arc<dyn DurableStore>, memory: Arc<MemoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            durable,
            memory,
            clock,
        }
    }

    /// 只使用进程内存储
    pub fn memory_only() -> Self {
        Self::new(
            Arc::new(DisconnectedStore),
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// 检查并消耗一次配额
    pub async fn check_and_consume(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let key = policy.key_for(identifier);

        if self.durable.is_available() {
            if let Some(decision) = self.consume_durable(&key, policy).await {
                return decision;
            }
            debug!(key = %key, "consuming from in-process store");
        }

        self.consume_memory(&key, policy)
    }

    /// 只读查询剩余配额，不消耗
    pub async fn peek(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let key = policy.key_for(identifier);

        if self.durable.is_available() {
            if let Some(decision) = self.peek_durable(&key, policy).await {
                return decision;
            }
        }

        self.peek_memory(&key, policy)
    }

    /// 依次检查多道限流，遇到第一道拒绝即返回，后面的关卡不再计数
    ///
    /// 全部通过时返回剩余配额最少的那一道。
    pub async fn check_all(&self, checks: &[(String, RateLimitPolicy)]) -> RateLimitDecision {
        let mut tightest: Option<RateLimitDecision> = None;

        for (identifier, policy) in checks {
            let decision = self.check_and_consume(identifier, policy).await;
            if !decision.allowed {
                warn!(
                    namespace = policy.namespace(),
                    retry_after = decision.retry_after_seconds,
                    "rate limit exceeded"
                );
                return decision;
            }
            tightest = Some(tighter(tightest, decision));
        }

        tightest.unwrap_or_else(|| self.unrestricted())
    }

    /// 按操作目录检查调用方
    pub async fn guard(&self, operation: Operation, identity: &Identity) -> RateLimitDecision {
        let checks: Vec<_> = operation
            .gates()
            .into_iter()
            .map(|gate| (identity.identifier_for(gate.scope), gate.policy))
            .collect();
        self.check_all(&checks).await
    }

    /// 按操作目录查询剩余配额，不消耗
    pub async fn peek_operation(&self, operation: Operation, identity: &Identity) -> RateLimitDecision {
        let mut tightest: Option<RateLimitDecision> = None;

        for gate in operation.gates() {
            let identifier = identity.identifier_for(gate.scope);
            let decision = self.peek(&identifier, &gate.policy).await;
            if !decision.allowed {
                return decision;
            }
            tightest = Some(tighter(tightest, decision));
        }

        tightest.unwrap_or_else(|| self.unrestricted())
    }

    /// 清除某个标识在命名空间下的计数
    pub async fn reset(&self, identifier: &str, namespace: &str) {
        let key = rate_limit_key(namespace, identifier);
        if self.durable.is_available() {
            if let Outcome::Error(e) = self.durable.delete(&key).await {
                warn!(key = %key, error = %e, "failed to reset durable counter");
            }
        }
        self.memory.delete(&key);
    }

    /// 清理进程内已过期的计数，窗口应不短于所有策略中最长的窗口
    pub fn cleanup_expired(&self, window: std::time::Duration) -> usize {
        let removed = self.memory.sweep(window, self.clock.now());
        if removed > 0 {
            debug!(removed, "swept expired rate limit entries");
        }
        removed
    }

    pub fn active_entry_count(&self) -> usize {
        self.memory.len()
    }

    pub fn clear_all(&self) -> usize {
        self.memory.clear()
    }

    pub fn durable_store_available(&self) -> bool {
        self.durable.is_available()
    }

    async fn consume_durable(&self, key: &str, policy: &RateLimitPolicy) -> Option<RateLimitDecision> {
        let window_secs = policy.window_secs();
        let count = match self.durable.increment_with_expiry(key, window_secs).await {
            Outcome::Ok(count) => count,
            Outcome::Unavailable => return None,
            Outcome::Error(e) => {
                warn!(key = %key, error = %e, "durable increment failed");
                return None;
            }
        };

        let now = self.clock.now();
        let limit = policy.max_requests();
        let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
        let allowed = count <= limit;
        let retry_after_seconds = if allowed {
            0
        } else {
            self.durable_ttl(key).await.unwrap_or(window_secs).max(1)
        };

        Some(RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(count),
            reset_at: now + window_delta(policy.window()),
            retry_after_seconds,
            backend: Backend::Durable,
        })
    }

    fn consume_memory(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now();
        let window = policy.window();
        let limit = policy.max_requests();
        let (entry, _) = self.memory.consume(key, window, now);
        let allowed = entry.count <= limit;

        RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(entry.count),
            reset_at: entry.window_ends_at(window),
            retry_after_seconds: if allowed {
                0
            } else {
                entry.seconds_until_reset(window, now)
            },
            backend: Backend::Memory,
        }
    }

    async fn peek_durable(&self, key: &str, policy: &RateLimitPolicy) -> Option<RateLimitDecision> {
        let raw = match self.durable.get(key).await {
            Outcome::Ok(raw) => raw,
            Outcome::Unavailable => return None,
            Outcome::Error(e) => {
                warn!(key = %key, error = %e, "durable read failed");
                return None;
            }
        };

        let now = self.clock.now();
        let limit = policy.max_requests();
        let window_secs = policy.window_secs();
        let count = raw.and_then(|value| value.trim().parse::<u32>().ok()).unwrap_or(0);
        let ttl = if count > 0 { self.durable_ttl(key).await } else { None };
        let exhausted = count >= limit;
        let reset_secs = ttl.unwrap_or(window_secs);

        Some(RateLimitDecision {
            allowed: !exhausted,
            limit,
            remaining: limit.saturating_sub(count),
            reset_at: now + window_delta(std::time::Duration::from_secs(reset_secs)),
            retry_after_seconds: if exhausted { reset_secs.max(1) } else { 0 },
            backend: Backend::Durable,
        })
    }

    fn peek_memory(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now();
        let window = policy.window();
        let limit = policy.max_requests();

        match self.memory.get(key).filter(|entry| !entry.is_expired(window, now)) {
            Some(entry) => {
                let exhausted = entry.count >= limit;
                RateLimitDecision {
                    allowed: !exhausted,
                    limit,
                    remaining: limit.saturating_sub(entry.count),
                    reset_at: entry.window_ends_at(window),
                    retry_after_seconds: if exhausted {
                        entry.seconds_until_reset(window, now)
                    } else {
                        0
                    },
                    backend: Backend::Memory,
                }
            }
            None => RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit,
                reset_at: now + window_delta(window),
                retry_after_seconds: 0,
                backend: Backend::Memory,
            },
        }
    }

    async fn durable_ttl(&self, key: &str) -> Option<u64> {
        self.durable.time_to_live(key).await.ok().flatten()
    }

    // 没有任何关卡的检查不受限制
    fn unrestricted(&self) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            limit: 0,
            remaining: 0,
            reset_at: self.clock.now(),
            retry_after_seconds: 0,
            backend: Backend::Memory,
        }
    }
}

fn tighter(current: Option<RateLimitDecision>, next: RateLimitDecision) -> RateLimitDecision {
    match current {
        Some(current) if current.remaining <= next.remaining => current,
        _ => next,
    }
}
