//! Per-process TTL/LRU cache for text blobs (§4.2, §9 design note).
//!
//! Backed by `moka`; eviction is deterministic on a monotonic clock and
//! `invalidate` guarantees no stale read is observable after a delete.

use moka::sync::Cache;
use std::time::Duration;

const DEFAULT_CAPACITY: u64 = 50;
const DEFAULT_TTL_SECS: u64 = 300;

pub struct TextCache {
    inner: Cache<String, String>,
}

impl Default for TextCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

impl TextCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: String, value: String) {
        self.inner.insert(key, value);
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.invalidate(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let cache = TextCache::default();
        cache.insert("k".into(), "v".into());
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = TextCache::default();
        cache.insert("k".into(), "v".into());
        cache.invalidate("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn ttl_expires_entries() {
        let cache = TextCache::new(10, Duration::from_millis(20));
        cache.insert("k".into(), "v".into());
        std::thread::sleep(Duration::from_millis(60));
        cache.inner.run_pending_tasks();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = TextCache::new(2, Duration::from_secs(300));
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("c".into(), "3".into());
        cache.inner.run_pending_tasks();
        assert_eq!(cache.inner.entry_count(), 2);
    }
}
