#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use guardrail::cache::{AnalyticsCacheOperations, CacheOperations, RateLimiter};
use guardrail::clock::{Clock, ManualClock};
use guardrail::error::StoreError;
use guardrail::store::{DurableStore, MemoryStore, Outcome};

/// 模拟持久存储的故障方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Up,
    /// 自报不可用，调用方不会发起请求
    Down,
    /// 自报可用，但每次调用都返回不可用
    Flaky,
    /// 每次调用都返回错误
    Broken,
}

#[derive(Debug, Clone)]
struct Stored {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// 进程内实现的持久存储，过期时间跟随手动时钟
#[derive(Debug)]
pub struct FakeDurableStore {
    entries: Mutex<HashMap<String, Stored>>,
    mode: Mutex<Mode>,
    clock: Arc<ManualClock>,
}

impl FakeDurableStore {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            mode: Mutex::new(Mode::Up),
            clock,
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|e| live(e, now)).count()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap();
        entries.get(key).filter(|e| live(e, now)).map(|e| e.value.clone())
    }

    /// 直接写入原始值，用于模拟损坏的缓存内容
    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Stored {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }

    fn gate<T>(&self) -> Option<Outcome<T>> {
        match *self.mode.lock().unwrap() {
            Mode::Up => None,
            Mode::Down | Mode::Flaky => Some(Outcome::Unavailable),
            Mode::Broken => Some(Outcome::Error(StoreError::Timeout(Duration::from_millis(
                500,
            )))),
        }
    }
}

fn live(entry: &Stored, now: DateTime<Utc>) -> bool {
    entry.expires_at.is_none_or(|at| now < at)
}

fn secs(n: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(n).unwrap())
}

#[async_trait]
impl DurableStore for FakeDurableStore {
    fn is_available(&self) -> bool {
        *self.mode.lock().unwrap() != Mode::Down
    }

    async fn increment_with_expiry(&self, key: &str, window_secs: u64) -> Outcome<i64> {
        if let Some(outcome) = self.gate() {
            return outcome;
        }
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        let next = match entries.get(key).filter(|e| live(e, now)) {
            Some(existing) => Stored {
                value: (existing.value.parse::<i64>().unwrap() + 1).to_string(),
                expires_at: existing.expires_at,
            },
            None => Stored {
                value: "1".to_string(),
                expires_at: Some(now + secs(window_secs.max(1))),
            },
        };
        let count = next.value.parse().unwrap();
        entries.insert(key.to_string(), next);
        Outcome::Ok(count)
    }

    async fn get(&self, key: &str) -> Outcome<Option<String>> {
        if let Some(outcome) = self.gate() {
            return outcome;
        }
        Outcome::Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Outcome<()> {
        if let Some(outcome) = self.gate() {
            return outcome;
        }
        let expires_at = Some(self.clock.now() + secs(ttl_secs));
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Stored {
                value: value.to_string(),
                expires_at,
            },
        );
        Outcome::Ok(())
    }

    async fn delete(&self, key: &str) -> Outcome<bool> {
        if let Some(outcome) = self.gate() {
            return outcome;
        }
        let now = self.clock.now();
        let removed = self.entries.lock().unwrap().remove(key);
        Outcome::Ok(removed.is_some_and(|e| live(&e, now)))
    }

    async fn time_to_live(&self, key: &str) -> Outcome<Option<u64>> {
        if let Some(outcome) = self.gate() {
            return outcome;
        }
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap();
        let ttl = entries
            .get(key)
            .filter(|e| live(e, now))
            .and_then(|e| e.expires_at)
            .map(|at| {
                let millis = (at - now).num_milliseconds().max(0) as u64;
                millis.div_ceil(1000)
            });
        Outcome::Ok(ttl)
    }
}

/// 测试用的一组限流器和缓存，共享同一个时钟和持久存储
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub durable: Arc<FakeDurableStore>,
    pub limiter: RateLimiter,
    pub cache: Arc<CacheOperations>,
    pub analytics: AnalyticsCacheOperations,
}

impl Harness {
    pub fn new(mode: Mode) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let durable = Arc::new(FakeDurableStore::new(Arc::clone(&clock)));
        durable.set_mode(mode);

        let limiter = RateLimiter::new(
            durable.clone(),
            Arc::new(MemoryStore::new()),
            clock.clone(),
        );
        let cache = Arc::new(CacheOperations::new(durable.clone(), clock.clone()));
        let analytics = AnalyticsCacheOperations::new(Arc::clone(&cache));

        Self {
            clock,
            durable,
            limiter,
            cache,
            analytics,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}
