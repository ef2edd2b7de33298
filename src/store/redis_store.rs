use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client as RedisClient, RedisResult, Script, aio::MultiplexedConnection};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::{DurableStore, Outcome};
use crate::error::StoreError;

/// INCR 与 EXPIRE 放在同一个脚本里执行，避免计数键在两条命令之间失去过期时间
const INCREMENT_WITH_EXPIRY: &str = r#"
local count = redis.call('INCR', KEYS[1])
if redis.call('TTL', KEYS[1]) < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// 基于 Redis 的持久存储
pub struct RedisStore {
    client: RedisClient,
    connection: Mutex<Option<MultiplexedConnection>>,
    increment_script: Script,
    timeout: Duration,
    retry_interval: Duration,
    // 0 表示可用，否则为恢复探测的毫秒时间戳
    down_until_ms: AtomicI64,
}

impl RedisStore {
    pub fn new(client: RedisClient, timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            client,
            connection: Mutex::new(None),
            increment_script: Script::new(INCREMENT_WITH_EXPIRY),
            timeout,
            retry_interval,
            down_until_ms: AtomicI64::new(0),
        }
    }

    /// 解析连接地址，不会立即建立连接
    pub fn open(url: &str, timeout: Duration, retry_interval: Duration) -> Result<Self, StoreError> {
        let client = RedisClient::open(url)?;
        Ok(Self::new(client, timeout, retry_interval))
    }

    /// 取缓存的连接，没有时建立新连接；建立连接期间不持有锁
    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let cached = self.connection.lock().await.clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        let mut cached = self.connection.lock().await;
        Ok(cached.get_or_insert(conn).clone())
    }

    /// 建立连接和执行命令共用同一个超时
    async fn call<T, F, Fut>(&self, command: F) -> Result<T, StoreError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut + Send,
        Fut: Future<Output = RedisResult<T>> + Send,
    {
        let attempt = async {
            let conn = self.connection().await?;
            Ok::<T, StoreError>(command(conn).await?)
        };
        timeout(self.timeout, attempt)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> Outcome<T>
    where
        T: Send,
        F: FnOnce(MultiplexedConnection) -> Fut + Send,
        Fut: Future<Output = RedisResult<T>> + Send,
    {
        match self.call(command).await {
            Ok(value) => {
                self.mark_up();
                Outcome::Ok(value)
            }
            Err(e) if e.is_unavailable() => {
                warn!(op, error = %e, "redis unavailable, falling back to in-process store");
                self.mark_down();
                Outcome::Unavailable
            }
            Err(e) => {
                error!(op, error = %e, "redis command failed");
                Outcome::Error(e)
            }
        }
    }

    fn mark_up(&self) {
        if self.down_until_ms.swap(0, Ordering::SeqCst) != 0 {
            info!("redis connection recovered");
        }
    }

    fn mark_down(&self) {
        let retry_ms = i64::try_from(self.retry_interval.as_millis()).unwrap_or(i64::MAX);
        let until = Utc::now().timestamp_millis().saturating_add(retry_ms);
        self.down_until_ms.store(until.max(1), Ordering::SeqCst);
        // 丢弃旧连接，下次探测时重新建立；锁被占用时说明有人正在取连接，不等待
        if let Ok(mut cached) = self.connection.try_lock() {
            cached.take();
        }
    }
}

#[async_trait]
impl DurableStore for RedisStore {
    fn is_available(&self) -> bool {
        let until = self.down_until_ms.load(Ordering::SeqCst);
        until == 0 || Utc::now().timestamp_millis() >= until
    }

    async fn increment_with_expiry(&self, key: &str, window_secs: u64) -> Outcome<i64> {
        let script = &self.increment_script;
        self.run("increment_with_expiry", |mut conn| async move {
            let mut invocation = script.key(key);
            invocation.arg(window_secs.max(1));
            invocation.invoke_async(&mut conn).await
        })
        .await
    }

    async fn get(&self, key: &str) -> Outcome<Option<String>> {
        self.run("get", |mut conn| async move { conn.get(key).await })
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Outcome<()> {
        self.run("set", |mut conn| async move {
            conn.set_ex(key, value, ttl_secs.max(1)).await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Outcome<bool> {
        self.run("delete", |mut conn| async move {
            let removed: i64 = conn.del(key).await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn time_to_live(&self, key: &str) -> Outcome<Option<u64>> {
        self.run("time_to_live", |mut conn| async move {
            // -2 表示键不存在，-1 表示没有过期时间
            let ttl: i64 = conn.ttl(key).await?;
            Ok(ttl_from_reply(ttl))
        })
        .await
    }
}

/// TTL 命令返回 -2 表示键不存在，-1 表示没有过期时间，二者都映射为 `None`
fn ttl_from_reply(ttl: i64) -> Option<u64> {
    u64::try_from(ttl).ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use tokio::net::TcpListener;

    use super::*;

    fn open(addr: std::net::SocketAddr, timeout: Duration, retry: Duration) -> RedisStore {
        RedisStore::open(&format!("redis://{}", addr), timeout, retry).unwrap()
    }

    #[test]
    fn negative_ttl_replies_mean_no_expiry() {
        assert_eq!(ttl_from_reply(-2), None);
        assert_eq!(ttl_from_reply(-1), None);
        assert_eq!(ttl_from_reply(0), Some(0));
        assert_eq!(ttl_from_reply(42), Some(42));
    }

    #[tokio::test]
    async fn closed_port_is_unavailable_until_retry_interval_passes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = open(addr, Duration::from_millis(500), Duration::from_millis(100));
        assert!(store.is_available());

        let outcome = store.increment_with_expiry("k", 60).await;
        assert!(matches!(outcome, Outcome::Unavailable), "{:?}", outcome);
        assert!(!store.is_available());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.is_available());
    }

    #[tokio::test]
    async fn silent_server_is_bounded_by_timeout_under_concurrency() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // 接受连接但从不回复
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let store = Arc::new(open(addr, Duration::from_millis(200), Duration::from_secs(30)));
        let started = Instant::now();
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.increment_with_expiry(&format!("k{}", i), 60).await })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(matches!(outcome, Outcome::Unavailable), "{:?}", outcome);
        }
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_millis(1_000), "took {:?}", elapsed);
        assert!(!store.is_available());

        server.abort();
    }
}
