//! Bounded query cache for embedding results.
//!
//! Entries expire after a TTL; when full, the least recently used entry
//! is evicted. Default: 1000 entries, 1-hour TTL.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;

/// Thread-safe LRU cache keyed by the exact query text.
pub struct QueryCache {
    inner: Mutex<Slots>,
}

struct Slots {
    entries: HashMap<String, (Array1<f32>, Instant)>,
    recency: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl Slots {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn forget(&mut self, key: &str) {
        self.entries.remove(key);
        self.recency.retain(|k| k != key);
    }
}

impl QueryCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Slots {
                entries: HashMap::with_capacity(capacity),
                recency: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
                ttl,
            }),
        }
    }

    /// Create a cache with default settings (1000 entries, 1hr TTL).
    pub fn default_cache() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }

    /// Get a cached embedding. Returns None on miss or expired entry.
    pub fn get(&self, query: &str) -> Option<Array1<f32>> {
        let mut slots = self.inner.lock();
        let (embedding, inserted_at) = slots.entries.get(query)?.clone();

        if inserted_at.elapsed() >= slots.ttl {
            slots.forget(query);
            return None;
        }

        slots.touch(query);
        Some(embedding)
    }

    /// Insert an embedding, evicting the least recently used entry when full.
    pub fn put(&self, query: String, embedding: Array1<f32>) {
        let mut slots = self.inner.lock();

        if slots.entries.contains_key(&query) {
            slots.touch(&query);
        } else {
            while slots.entries.len() >= slots.capacity {
                match slots.recency.pop_front() {
                    Some(oldest) => {
                        slots.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            slots.recency.push_back(query.clone());
        }

        slots.entries.insert(query, (embedding, Instant::now()));
    }

    /// Number of entries in the cache.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cache_hit_and_miss() {
        let cache = QueryCache::new(10, Duration::from_secs(3600));
        assert!(cache.get("hello").is_none());

        cache.put("hello".into(), array![1.0, 2.0, 3.0]);
        assert_eq!(cache.get("hello"), Some(array![1.0, 2.0, 3.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = QueryCache::new(2, Duration::from_secs(3600));
        cache.put("a".into(), array![1.0]);
        cache.put("b".into(), array![2.0]);

        // Reading "a" makes "b" the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.put("c".into(), array![3.0]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_cache_ttl_expiry() {
        let cache = QueryCache::new(10, Duration::from_millis(1));
        cache.put("ephemeral".into(), array![1.0]);

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("ephemeral").is_none());
        assert!(cache.is_empty());
    }
}
