//! Byte-budgeted LRU cache.
//!
//! Sizes are caller-supplied, so one cache can hold heterogeneous values
//! (tier listings, query results) under a single byte budget. Eviction is
//! act-then-enforce: the new entry is always inserted, then least-recently
//! used entries are popped until the budget holds again. An entry larger
//! than the whole budget is evicted immediately by its own insertion.

use std::hash::Hash;

use lru::LruCache;
use parking_lot::Mutex;

struct Entry<V> {
    value: V,
    size: usize,
}

struct Inner<K: Hash + Eq, V> {
    map: LruCache<K, Entry<V>>,
    bytes_used: usize,
}

pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Mutex<Inner<K, V>>,
    max_bytes: usize,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: LruCache::unbounded(),
                bytes_used: 0,
            }),
            max_bytes,
        }
    }

    /// Insert or replace, then evict LRU entries until the budget holds.
    pub fn set(&self, key: K, value: V, size: usize) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some((_, old)) = inner.map.push(key, Entry { value, size }) {
            inner.bytes_used = inner.bytes_used.saturating_sub(old.size);
        }
        inner.bytes_used += size;
        while inner.bytes_used > self.max_bytes {
            match inner.map.pop_lru() {
                Some((_, evicted)) => {
                    inner.bytes_used = inner.bytes_used.saturating_sub(evicted.size);
                }
                None => break,
            }
        }
    }

    /// Fetch a value, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().map.get(key).map(|e| e.value.clone())
    }

    /// Presence check that does not touch recency order.
    pub fn has(&self, key: &K) -> bool {
        self.inner.lock().map.contains(key)
    }

    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        guard.map.clear();
        guard.bytes_used = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes_used(&self) -> usize {
        self.inner.lock().bytes_used
    }
}
