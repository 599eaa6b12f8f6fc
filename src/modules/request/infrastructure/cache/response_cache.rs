use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::modules::request::domain::CacheKey;

/// Cached entry with its insertion time and recency stamp
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    recency: u64,
}

/// Entries plus a recency index over the same keys.
///
/// `recency` maps a monotonically increasing stamp to its key, so the first
/// element is always the least recently used entry.
#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    recency: BTreeMap<u64, CacheKey>,
    next_stamp: u64,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_stamp: 0,
        }
    }

    fn stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.recency);
        Some(entry)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl: Duration,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// In-memory response cache with a hard TTL and LRU eviction.
///
/// Expiry is lazy: a stale entry is only dropped when it is read or when
/// capacity pressure evicts it.
#[derive(Debug)]
pub struct ResponseCache<V = Value> {
    state: Mutex<CacheState<V>>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::new()),
            ttl,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    /// Fetch a live entry and mark it most recently used
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let mut state = self.state.lock().await;

        let stored_at = match state.entries.get(key) {
            Some(entry) => entry.stored_at,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for key: {}", key);
                return None;
            }
        };

        if stored_at.elapsed() > self.ttl {
            state.remove(key);
            self.expired.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Removed expired cache entry for key: {}", key);
            return None;
        }

        let stamp = state.stamp();
        let entry = state.entries.get_mut(key)?;
        let previous = std::mem::replace(&mut entry.recency, stamp);
        let value = entry.value.clone();
        state.recency.remove(&previous);
        state.recency.insert(stamp, key.clone());

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!("Cache hit for key: {}", key);
        Some(value)
    }

    /// Store a value, evicting least recently used entries while at capacity
    pub async fn set(&self, key: CacheKey, value: V) {
        let mut state = self.state.lock().await;

        state.remove(&key);

        while state.entries.len() >= self.max_entries {
            let Some((_, lru_key)) = state.recency.pop_first() else {
                break;
            };
            state.entries.remove(&lru_key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted least recently used key: {}", lru_key);
        }

        let stamp = state.stamp();
        state.recency.insert(stamp, key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                recency: stamp,
            },
        );
    }

    /// Drop a single entry if present
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.state.lock().await.remove(key).is_some()
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = CacheState::new();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expired.store(0, Ordering::Relaxed);
        info!("Cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len().await,
            max_size: self.max_entries,
            ttl: self.ttl,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}
