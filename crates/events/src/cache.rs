//! Bounded, time-expiring in-process cache.
//!
//! The identity and preference services sit behind this cache instead of an
//! unbounded process-lifetime map: entries expire after a TTL and the map is
//! capped, so a preference change becomes visible within one TTL window and
//! memory stays bounded under high-cardinality keys. There is no cross-process
//! invalidation; the staleness window is an accepted property of the design.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A fixed-capacity map whose entries expire `ttl` after insertion.
pub struct TimedCache<K, V> {
    entries: HashMap<K, (V, Instant)>,
    ttl: Duration,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TimedCache<K, V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Get a non-expired entry.
    pub fn get(&self, key: &K) -> Option<V> {
        let (value, inserted_at) = self.entries.get(key)?;
        if inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(value.clone())
    }

    /// Insert or replace an entry, stamping it with the current time.
    ///
    /// When the cache is full, expired entries are dropped first; if it is
    /// still full the oldest entry is evicted.
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.entries.retain(|_, (_, at)| at.elapsed() < self.ttl);

            if self.entries.len() >= self.capacity {
                if let Some(oldest) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, (_, at))| *at)
                    .map(|(k, _)| k.clone())
                {
                    self.entries.remove(&oldest);
                }
            }
        }
        self.entries.insert(key, (value, Instant::now()));
    }

    /// Drop an entry, e.g. after a write-through update.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_inserted_value() {
        let mut cache = TimedCache::new(Duration::from_secs(60), 16);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = TimedCache::new(Duration::from_millis(5), 16);
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut cache = TimedCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        assert!(cache.len() <= 2);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = TimedCache::new(Duration::from_secs(60), 16);
        cache.insert("a", 1);
        cache.invalidate(&"a");
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn reinserting_existing_key_does_not_evict_others() {
        let mut cache = TimedCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), Some(2));
    }
}
