//! Cache collaborator interface consumed by the caching strategy
//!
//! Eviction policy is the cache's concern, not the circuit's: the strategy
//! only looks values up and reports hits and misses. `record_hit` is the
//! bookkeeping signal that makes LRU/LFU-style policies possible outside the
//! strategy. Two reference implementations are provided: an unbounded
//! [`MemoryCache`] and a bounded [`LruCache`].

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;

/// Key-value store consulted by the caching strategy.
///
/// Keys are the call's request; values are successful results. Failures are
/// never stored.
pub trait Cache<K, V>: Send + Sync {
    /// Whether a value is present for `key`.
    fn has(&self, key: &K) -> bool;

    /// The stored value for `key`, if any.
    fn get(&self, key: &K) -> Option<V>;

    /// Called when a stored value was served instead of the dependency.
    fn record_hit(&self, key: &K);

    /// Called with every fresh successful result.
    fn record_miss(&self, key: K, value: V);
}

struct MemoryEntry<V> {
    value: V,
    hits: u64,
}

/// Unbounded in-memory cache with per-key hit counters.
pub struct MemoryCache<K, V> {
    entries: Mutex<HashMap<K, MemoryEntry<V>>>,
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `key` has been served from the cache.
    pub fn hits(&self, key: &K) -> u64 {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.hits)
            .unwrap_or(0)
    }
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    fn has(&self, key: &K) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.value.clone())
    }

    fn record_hit(&self, key: &K) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key) {
            entry.hits += 1;
        }
    }

    fn record_miss(&self, key: K, value: V) {
        self.entries
            .lock()
            .unwrap()
            .insert(key, MemoryEntry { value, hits: 0 });
    }
}

struct LruInner<K, V> {
    map: HashMap<K, V>,
    // front = least recently used
    order: VecDeque<K>,
}

/// Bounded in-memory cache evicting the least-recently-used entry.
///
/// `record_hit` and `record_miss` both refresh recency.
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<LruInner<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "lru capacity must be positive");
        Self {
            capacity,
            inner: Mutex::new(LruInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> LruInner<K, V>
where
    K: Clone + Eq + Hash,
{
    fn touch(&mut self, key: &K) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Clone + Eq + Hash + Send,
    V: Clone + Send,
{
    fn has(&self, key: &K) -> bool {
        self.inner.lock().unwrap().map.contains_key(key)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().unwrap().map.get(key).cloned()
    }

    fn record_hit(&self, key: &K) {
        let mut inner = self.inner.lock().unwrap();
        if inner.map.contains_key(key) {
            inner.touch(key);
        }
    }

    fn record_miss(&self, key: K, value: V) {
        let mut inner = self.inner.lock().unwrap();
        inner.map.insert(key.clone(), value);
        inner.touch(&key);
        while inner.map.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cache_stores_and_counts_hits() {
        let cache = MemoryCache::new();
        assert!(!cache.has(&"k"));
        cache.record_miss("k", 1);
        assert!(cache.has(&"k"));
        assert_eq!(cache.get(&"k"), Some(1));
        assert_eq!(cache.hits(&"k"), 0);
        cache.record_hit(&"k");
        cache.record_hit(&"k");
        assert_eq!(cache.hits(&"k"), 2);
        // overwriting resets the counter
        cache.record_miss("k", 2);
        assert_eq!(cache.get(&"k"), Some(2));
        assert_eq!(cache.hits(&"k"), 0);
    }

    #[test]
    fn lru_cache_evicts_least_recently_used() {
        let cache = LruCache::new(2);
        cache.record_miss("a", 1);
        cache.record_miss("b", 2);
        cache.record_hit(&"a");
        cache.record_miss("c", 3);
        assert!(cache.has(&"a"));
        assert!(!cache.has(&"b"));
        assert!(cache.has(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    #[should_panic(expected = "lru capacity must be positive")]
    fn lru_rejects_zero_capacity() {
        let _: LruCache<u32, u32> = LruCache::new(0);
    }
}
