use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::cache::models::RateLimitEntry;

/// 进程内限流计数存储
///
/// 不主动过期，读写时惰性判断，另外提供 [`MemoryStore::sweep`] 供外部定期调用。
/// 同一个键的读改写在分片锁内完成，多线程并发不会丢失计数。
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出记录，不存在时以计数1创建
    pub fn get_or_create(&self, key: &str, now: DateTime<Utc>) -> RateLimitEntry {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::new(key, now))
            .value()
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn increment(entry: &RateLimitEntry, now: DateTime<Utc>) -> RateLimitEntry {
        entry.incremented(now)
    }

    pub fn is_expired(entry: &RateLimitEntry, window: Duration, now: DateTime<Utc>) -> bool {
        entry.is_expired(window, now)
    }

    /// 消耗一次配额并返回更新后的记录
    ///
    /// 新建或窗口过期时用计数1的新记录替换，否则计数加一。第二个返回值表示是否开启了新窗口。
    pub fn consume(&self, key: &str, window: Duration, now: DateTime<Utc>) -> (RateLimitEntry, bool) {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(window, now) {
                    let fresh = RateLimitEntry::new(key, now);
                    occupied.insert(fresh.clone());
                    (fresh, true)
                } else {
                    let next = occupied.get().incremented(now);
                    occupied.insert(next.clone());
                    (next, false)
                }
            }
            Entry::Vacant(vacant) => {
                let fresh = RateLimitEntry::new(key, now);
                vacant.insert(fresh.clone());
                (fresh, true)
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// 删除所有已过期的记录，返回删除数量
    pub fn sweep(&self, window: Duration, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(window, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn get_or_create_starts_at_one_and_does_not_count_twice() {
        let store = MemoryStore::new();
        assert_eq!(store.get_or_create("k", at(0)).count, 1);
        assert_eq!(store.get_or_create("k", at(1)).count, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn consume_counts_within_window_and_replaces_after_it() {
        let store = MemoryStore::new();
        assert_eq!(store.consume("k", WINDOW, at(0)), (RateLimitEntry::new("k", at(0)), true));
        assert_eq!(store.consume("k", WINDOW, at(10)).0.count, 2);
        assert_eq!(store.consume("k", WINDOW, at(20)).0.count, 3);

        let (fresh, new_window) = store.consume("k", WINDOW, at(61));
        assert!(new_window);
        assert_eq!(fresh.count, 1);
        assert_eq!(fresh.first_request_at, at(61));
    }

    #[test]
    fn sweep_only_removes_expired_entries() {
        let store = MemoryStore::new();
        store.consume("old", WINDOW, at(0));
        store.consume("new", WINDOW, at(50));
        assert_eq!(store.sweep(WINDOW, at(100)), 1);
        assert!(store.get("old").is_none());
        assert!(store.get("new").is_some());
    }

    #[test]
    fn delete_and_clear_report_what_they_removed() {
        let store = MemoryStore::new();
        store.consume("a", WINDOW, at(0));
        store.consume("b", WINDOW, at(0));
        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_consumers_never_lose_updates() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store.consume("hot", WINDOW, at(0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get("hot").unwrap().count, 2_000);
    }
}
