//! In-memory TTL cache with LRU eviction and a stale-serve window.
//!
//! Each entry carries its own expiry. Lookups past the fresh expiry but
//! inside the stale window can still be served (explicitly, via
//! [`TtlCache::get_allow_stale`]) so the data clients can degrade
//! gracefully when an upstream is rate limited or down. Fully expired
//! entries are dropped on access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Value returned by a stale-tolerant lookup.
///
/// `is_stale` is informational only; it is never written back into the
/// cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stale<V> {
    pub value: V,
    pub is_stale: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_used: u64,
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<String, CacheEntry<V>>,
    tick: u64,
}

/// Thread-safe TTL + LRU cache.
///
/// All mutation paths (touch-on-access, insert, evict) run under one
/// lock so concurrent callers never observe a torn order update.
#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Mutex<CacheInner<V>>,
    max_size: usize,
    default_ttl: Duration,
    stale_window: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with a stale-serve window past each entry's expiry.
    pub fn new(max_size: usize, default_ttl: Duration, stale_window: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                tick: 0,
            }),
            max_size,
            default_ttl,
            stale_window,
        }
    }

    /// Create a cache with no stale window: expired means gone.
    pub fn with_ttl(max_size: usize, default_ttl: Duration) -> Self {
        Self::new(max_size, default_ttl, Duration::ZERO)
    }

    /// Fresh lookup. Expired entries return `None`; entries past the
    /// stale window are removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        let now = Instant::now();

        let expires_at = inner.map.get(key)?.expires_at;
        if now > expires_at + self.stale_window {
            inner.map.remove(key);
            return None;
        }
        if now > expires_at {
            return None;
        }

        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner
            .map
            .get_mut(key)
            .expect("entry present under the same lock");
        entry.last_used = tick;
        Some(entry.value.clone())
    }

    /// Lookup that tolerates staleness. Returns the value with
    /// `is_stale = true` between expiry and the end of the stale
    /// window, and `None` once the window has passed.
    pub fn get_allow_stale(&self, key: &str) -> Option<Stale<V>> {
        let mut inner = self.lock();
        let now = Instant::now();

        let expires_at = inner.map.get(key)?.expires_at;
        if now > expires_at + self.stale_window {
            inner.map.remove(key);
            return None;
        }

        let is_stale = now > expires_at;
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner
            .map
            .get_mut(key)
            .expect("entry present under the same lock");
        entry.last_used = tick;
        Some(Stale {
            value: entry.value.clone(),
            is_stale,
        })
    }

    /// Insert with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL, then evict least-recently-used
    /// entries until the cache is back within capacity.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        inner.map.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                last_used: tick,
            },
        );

        while inner.map.len() > self.max_size {
            let oldest = inner
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    inner.map.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.lock().map.remove(key);
    }

    pub fn clear(&self) {
        self.lock().map.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().expect("cache lock is not poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_value() {
        let cache = TtlCache::with_ttl(10, Duration::from_secs(60));

        assert!(cache.get("missing").is_none());

        cache.set("quote", 42);
        assert_eq!(cache.get("quote"), Some(42));

        cache.set("quote", 43);
        assert_eq!(cache.get("quote"), Some(43));
    }

    #[test]
    fn expired_entry_is_absent() {
        let cache = TtlCache::with_ttl(10, Duration::from_millis(30));

        cache.set("quote", 1);
        assert_eq!(cache.get("quote"), Some(1));

        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get("quote").is_none());
        assert!(cache.get_allow_stale("quote").is_none());
    }

    #[test]
    fn stale_window_serves_expired_value_with_marker() {
        let cache = TtlCache::new(10, Duration::from_millis(30), Duration::from_secs(10));

        cache.set("quote", 7);
        let fresh = cache.get_allow_stale("quote").expect("fresh hit");
        assert!(!fresh.is_stale);

        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get("quote").is_none(), "fresh lookup must miss");

        let stale = cache.get_allow_stale("quote").expect("stale hit");
        assert!(stale.is_stale);
        assert_eq!(stale.value, 7);
    }

    #[test]
    fn past_stale_window_entry_is_removed() {
        let cache = TtlCache::new(10, Duration::from_millis(20), Duration::from_millis(20));

        cache.set("quote", 7);
        std::thread::sleep(Duration::from_millis(60));

        assert!(cache.get_allow_stale("quote").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn insertion_beyond_capacity_evicts_least_recently_used() {
        let cache = TtlCache::with_ttl(3, Duration::from_secs(60));

        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get("a"), Some(1));

        cache.set("d", 4);
        assert_eq!(cache.len(), 3);
        assert!(cache.get("b").is_none(), "lru entry must be evicted");
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.get("d"), Some(4));
    }

    #[test]
    fn ttl_override_beats_default() {
        let cache = TtlCache::with_ttl(10, Duration::from_secs(60));

        cache.set_with_ttl("quote", 1, Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("quote").is_none());
    }

    #[test]
    fn invalidate_and_clear_remove_entries() {
        let cache = TtlCache::with_ttl(10, Duration::from_secs(60));

        cache.set("a", 1);
        cache.set("b", 2);

        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
