//! Time-bounded response cache.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::key::CacheKey;
use crate::config::validation::MAX_TTL_SECS;
use crate::config::CacheConfig;
use crate::observability::metrics;
use crate::proxy::ProxyResponse;

struct CacheEntry {
    response: Arc<ProxyResponse>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Point-in-time cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub live: usize,
    pub expired: usize,
    pub ttl_secs: u64,
}

/// A thread-safe cache of proxy responses with per-entry expiry.
///
/// Cloning is cheap and clones share the same storage.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<DashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    max_entries: Option<usize>,
}

impl ResponseCache {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration, max_entries: Option<usize>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
            max_entries,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    /// Default time-to-live for [`ResponseCache::insert`].
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry. Expired entries are evicted and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ProxyResponse>> {
        let now = Instant::now();
        if let Some(entry) = self.inner.get(key) {
            if entry.is_live(now) {
                return Some(entry.response.clone());
            }
            // Release the shard lock before removing.
            drop(entry);
            self.inner.remove_if(key, |_, entry| !entry.is_live(now));
            metrics::record_cache_size(self.inner.len());
        }
        None
    }

    /// Store a snapshot of `response` under `key` for `ttl`. Last write wins.
    ///
    /// `ttl` is capped at [`MAX_TTL_SECS`].
    pub fn set(&self, key: CacheKey, response: ProxyResponse, ttl: Duration) -> Arc<ProxyResponse> {
        let now = Instant::now();
        let ttl = ttl.min(Duration::from_secs(MAX_TTL_SECS));
        let expires_at = now.checked_add(ttl).unwrap_or(now);
        let response = Arc::new(response);
        if !self.inner.contains_key(&key) {
            self.make_room();
        }
        self.inner.insert(
            key,
            CacheEntry {
                response: response.clone(),
                expires_at,
            },
        );
        metrics::record_cache_size(self.inner.len());
        response
    }

    /// Store with the cache's default ttl.
    pub fn insert(&self, key: CacheKey, response: ProxyResponse) -> Arc<ProxyResponse> {
        self.set(key, response, self.ttl)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
        tracing::info!("Response cache cleared");
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            metrics::record_cache_size(self.inner.len());
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut live = 0;
        let mut expired = 0;
        for entry in self.inner.iter() {
            if entry.value().is_live(now) {
                live += 1;
            } else {
                expired += 1;
            }
        }
        CacheStats {
            entries: live + expired,
            live,
            expired,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    /// Enforce the capacity bound before inserting a new key.
    ///
    /// Approximate under concurrent inserts.
    fn make_room(&self) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.inner.len() < max {
            return;
        }
        self.purge_expired();

        while self.inner.len() >= max {
            let victim = self
                .inner
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    tracing::debug!(key = %key, "Evicting cache entry at capacity");
                    self.inner.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.inner.len())
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn ok(payload: &str) -> ProxyResponse {
        ProxyResponse::ok(payload.to_string())
    }

    #[test]
    fn test_cache_operations() {
        let cache = ResponseCache::new(Duration::from_secs(60), None);
        let key = CacheKey::new("resource-with-subscribers", "42");

        assert!(cache.get(&key).is_none());

        cache.insert(key.clone(), ok("{}"));
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.payload.as_deref(), Some("{}"));

        // Last write wins
        cache.insert(key.clone(), ok("[]"));
        assert_eq!(cache.get(&key).unwrap().payload.as_deref(), Some("[]"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expiry() {
        let cache = ResponseCache::new(Duration::from_secs(60), None);
        let key = CacheKey::new("e", "1");

        cache.set(key.clone(), ok("{}"), Duration::from_millis(30));
        assert!(cache.get(&key).is_some());

        sleep(Duration::from_millis(60));
        assert!(cache.get(&key).is_none());
        // Expired read evicts
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let config = CacheConfig {
            ttl_secs: i64::MAX as u64,
            max_entries: None,
        };
        let cache = ResponseCache::from_config(&config);
        let key = CacheKey::new("e", "1");

        cache.insert(key.clone(), ok("{}"));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.stats().live, 1);
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new(Duration::from_secs(60), None);
        cache.insert(CacheKey::new("e", "1"), ok("{}"));
        cache.insert(CacheKey::new("e", "2"), ok("{}"));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&CacheKey::new("e", "1")).is_none());
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = ResponseCache::new(Duration::from_secs(60), None);
        let other = cache.clone();
        cache.insert(CacheKey::new("e", "1"), ok("{}"));
        assert!(other.get(&CacheKey::new("e", "1")).is_some());
        other.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_composite_keys_do_not_collide() {
        let cache = ResponseCache::new(Duration::from_secs(60), None);
        cache.insert(CacheKey::new("ab", "c"), ok("1"));
        cache.insert(CacheKey::new("a", "bc"), ok("2"));

        assert_eq!(cache.get(&CacheKey::new("ab", "c")).unwrap().payload.as_deref(), Some("1"));
        assert_eq!(cache.get(&CacheKey::new("a", "bc")).unwrap().payload.as_deref(), Some("2"));
    }

    #[test]
    fn test_capacity_evicts_soonest_expiry() {
        let cache = ResponseCache::new(Duration::from_secs(60), Some(2));
        cache.set(CacheKey::new("e", "short"), ok("{}"), Duration::from_secs(5));
        cache.set(CacheKey::new("e", "long"), ok("{}"), Duration::from_secs(500));
        cache.set(CacheKey::new("e", "new"), ok("{}"), Duration::from_secs(60));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new("e", "short")).is_none());
        assert!(cache.get(&CacheKey::new("e", "long")).is_some());
        assert!(cache.get(&CacheKey::new("e", "new")).is_some());
    }

    #[test]
    fn test_capacity_prefers_purging_expired() {
        let cache = ResponseCache::new(Duration::from_secs(60), Some(2));
        cache.set(CacheKey::new("e", "stale"), ok("{}"), Duration::from_millis(10));
        cache.set(CacheKey::new("e", "keep"), ok("{}"), Duration::from_secs(1));
        sleep(Duration::from_millis(30));

        cache.insert(CacheKey::new("e", "new"), ok("{}"));
        assert!(cache.get(&CacheKey::new("e", "keep")).is_some());
        assert!(cache.get(&CacheKey::new("e", "new")).is_some());
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = ResponseCache::new(Duration::from_secs(60), Some(1));
        cache.insert(CacheKey::new("e", "1"), ok("a"));
        cache.insert(CacheKey::new("e", "1"), ok("b"));
        assert_eq!(cache.get(&CacheKey::new("e", "1")).unwrap().payload.as_deref(), Some("b"));
    }

    #[test]
    fn test_stats_and_purge() {
        let cache = ResponseCache::new(Duration::from_secs(252), None);
        cache.set(CacheKey::new("e", "1"), ok("{}"), Duration::from_millis(10));
        cache.insert(CacheKey::new("e", "2"), ok("{}"));
        sleep(Duration::from_millis(30));

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { entries: 2, live: 1, expired: 1, ttl_secs: 252 });

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
