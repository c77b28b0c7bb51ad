use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::logging::log_cache;

/// Cached payload with the instant it was stored and its own TTL
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Entry count at which an insert first sweeps out stale entries
pub const DEFAULT_SWEEP_THRESHOLD: usize = 256;

/// Process-wide TTL map. No eviction policy beyond expiry: stale entries go
/// on `get`, and every insert into a map holding `sweep_threshold` or more
/// entries purges them all.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    sweep_threshold: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
        }
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // Entries are plain data; a panic mid-insert cannot leave them torn.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. A stale entry is evicted.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh_at(now) => {
                log_cache("hit", key);
                Some(entry.data.clone())
            }
            Some(_) => {
                entries.remove(key);
                log_cache("expired", key);
                None
            }
            None => {
                log_cache("miss", key);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    pub fn set_default(&self, key: &str, value: V) {
        self.set(key, value, self.default_ttl);
    }

    fn set_at(&self, key: &str, value: V, ttl: Duration, stored_at: Instant) {
        let mut entries = self.lock();
        if entries.len() >= self.sweep_threshold {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_fresh_at(stored_at));
            if entries.len() < before {
                log_cache("sweep", &format!("{} expired", before - entries.len()));
            }
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                stored_at,
                ttl,
            },
        );
    }

    pub fn clear(&self) {
        self.lock().clear();
        log_cache("clear", "*");
    }

    /// Drop every stale entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh_at(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Cache key for an endpoint plus its filter parameters. Parameter order
/// does not matter.
pub fn cache_key(endpoint: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return endpoint.to_string();
    }
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", endpoint, query.join("&"))
}
