//! LRU cache with TTL expiration, tracking which keys in the redb-backed
//! hot-read cache are worth keeping warm.
//!
//! This module provides an in-memory LRU (Least Recently Used) metadata
//! layer that sits in front of the redb tables in [`crate::CacheStorage`],
//! implementing:
//! - LRU eviction policy when the tracked key set is full
//! - TTL-based expiration with lazy and background cleanup
//! - Cache metrics tracking (hit rate, miss rate, evictions)
//! - Configurable size limits and TTL values
//!
//! # Example
//!
//! ```no_run
//! use memory_storage_cache::{CacheConfig, LRUCache};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig {
//!     max_size: 1000,
//!     default_ttl_secs: 3600,
//!     cleanup_interval_secs: 300,
//!     enable_background_cleanup: true,
//! };
//!
//! let cache = LRUCache::new(config);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Configuration for the LRU cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of items to track
    pub max_size: usize,
    /// Default TTL in seconds (0 = no expiration)
    pub default_ttl_secs: u64,
    /// Background cleanup interval in seconds
    pub cleanup_interval_secs: u64,
    /// Enable background cleanup task
    pub enable_background_cleanup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl_secs: 3600,     // 1 hour
            cleanup_interval_secs: 300, // 5 minutes
            enable_background_cleanup: true,
        }
    }
}

/// Metadata for a tracked key
#[derive(Debug, Clone)]
struct CacheEntry {
    last_access: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    size_bytes: usize,
}

impl CacheEntry {
    fn new(ttl_secs: u64, size_bytes: usize) -> Self {
        let now = Utc::now();
        let expires_at = if ttl_secs > 0 {
            Some(now + Duration::seconds(ttl_secs as i64))
        } else {
            None
        };

        Self {
            last_access: now,
            expires_at,
            size_bytes,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }

    fn touch(&mut self) {
        self.last_access = Utc::now();
    }
}

/// Cache performance metrics, exposed for `memory-cli`'s `monitor` command.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub item_count: usize,
    pub total_size_bytes: usize,
    pub hit_rate: f64,
}

impl CacheMetrics {
    fn calculate_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total > 0 { self.hits as f64 / total as f64 } else { 0.0 };
    }
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// LRU order: front = least recently used, back = most recently used
    lru_queue: VecDeque<String>,
    metrics: CacheMetrics,
}

impl CacheState {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            metrics: CacheMetrics::default(),
        }
    }
}

/// LRU cache with TTL expiration, keyed by the same string ids used
/// throughout `memory-core` (`strat_...`, `topic_...`, `skill_...`).
pub struct LRUCache {
    config: CacheConfig,
    state: Arc<RwLock<CacheState>>,
    cleanup_task: Option<JoinHandle<()>>,
}

impl LRUCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let state = Arc::new(RwLock::new(CacheState::new()));

        let cleanup_task = if config.enable_background_cleanup && config.cleanup_interval_secs > 0 {
            Some(Self::start_cleanup_task(Arc::clone(&state), config.cleanup_interval_secs))
        } else {
            None
        };

        info!(
            max_size = config.max_size,
            ttl_secs = config.default_ttl_secs,
            cleanup_secs = config.cleanup_interval_secs,
            "initialized hot-read cache tracker"
        );

        Self {
            config,
            state,
            cleanup_task,
        }
    }

    /// Record an access (hit or miss) for `key`. Returns whether the
    /// access should be served from the warm set (i.e. was a hit).
    pub async fn record_access(&self, key: &str, hit: bool, size_bytes: Option<usize>) -> bool {
        let mut state = self.state.write().await;

        if hit {
            if let Some(entry) = state.entries.get_mut(key) {
                if entry.is_expired() {
                    debug!(key, "cache entry expired on access");
                    state.metrics.expirations += 1;
                    state.metrics.misses += 1;
                    state.entries.remove(key);
                    state.lru_queue.retain(|k| k != key);
                    state.metrics.item_count = state.entries.len();
                    state.metrics.calculate_hit_rate();
                    return false;
                }

                entry.touch();
                state.lru_queue.retain(|k| k != key);
                state.lru_queue.push_back(key.to_string());

                state.metrics.hits += 1;
                state.metrics.calculate_hit_rate();
                true
            } else {
                state.metrics.misses += 1;
                state.metrics.calculate_hit_rate();
                false
            }
        } else {
            state.metrics.misses += 1;

            if let Some(size) = size_bytes {
                while state.entries.len() >= self.config.max_size && !state.lru_queue.is_empty() {
                    if let Some(evict_key) = state.lru_queue.pop_front() {
                        if let Some(evicted) = state.entries.remove(&evict_key) {
                            state.metrics.evictions += 1;
                            state.metrics.total_size_bytes =
                                state.metrics.total_size_bytes.saturating_sub(evicted.size_bytes);
                            debug!(key = evict_key, "evicted LRU entry");
                        }
                    }
                }

                let entry = CacheEntry::new(self.config.default_ttl_secs, size);
                state.metrics.total_size_bytes += size;
                state.entries.insert(key.to_string(), entry);
                state.lru_queue.push_back(key.to_string());
                state.metrics.item_count = state.entries.len();

                debug!(key, size, "tracked new cache entry");
            }

            state.metrics.calculate_hit_rate();
            false
        }
    }

    pub async fn remove(&self, key: &str) {
        let mut state = self.state.write().await;

        if let Some(entry) = state.entries.remove(key) {
            state.lru_queue.retain(|k| k != key);
            state.metrics.total_size_bytes = state.metrics.total_size_bytes.saturating_sub(entry.size_bytes);
            state.metrics.item_count = state.entries.len();
            debug!(key, "removed cache entry");
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        let state = self.state.read().await;
        state.entries.get(key).is_some_and(|entry| !entry.is_expired())
    }

    pub async fn get_metrics(&self) -> CacheMetrics {
        let state = self.state.read().await;
        state.metrics.clone()
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.lru_queue.clear();
        state.metrics.total_size_bytes = 0;
        state.metrics.item_count = 0;
        info!("cache cleared");
    }

    pub async fn cleanup_expired(&self) -> usize {
        let mut state = self.state.write().await;

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(k, _)| k.clone())
            .collect();

        let count = expired.len();
        for key in expired {
            if let Some(entry) = state.entries.remove(&key) {
                state.lru_queue.retain(|k| k != &key);
                state.metrics.total_size_bytes = state.metrics.total_size_bytes.saturating_sub(entry.size_bytes);
                state.metrics.expirations += 1;
            }
        }
        state.metrics.item_count = state.entries.len();

        if count > 0 {
            debug!(count, "cleaned up expired cache entries");
        }
        count
    }

    fn start_cleanup_task(state: Arc<RwLock<CacheState>>, interval_secs: u64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));

            loop {
                interval.tick().await;

                let mut guard = state.write().await;
                let expired: Vec<String> = guard
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.is_expired())
                    .map(|(k, _)| k.clone())
                    .collect();

                let count = expired.len();
                for key in expired {
                    if let Some(entry) = guard.entries.remove(&key) {
                        guard.lru_queue.retain(|k| k != &key);
                        guard.metrics.total_size_bytes = guard.metrics.total_size_bytes.saturating_sub(entry.size_bytes);
                        guard.metrics.expirations += 1;
                    }
                }
                guard.metrics.item_count = guard.entries.len();
                drop(guard);

                if count > 0 {
                    debug!(count, "background cleanup removed expired entries");
                }
            }
        })
    }

    pub fn stop_cleanup(&mut self) {
        if let Some(handle) = self.cleanup_task.take() {
            handle.abort();
            info!("stopped background cleanup task");
        }
    }
}

impl Drop for LRUCache {
    fn drop(&mut self) {
        self.stop_cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration as TokioDuration};

    fn create_test_cache(max_size: usize, ttl_secs: u64) -> LRUCache {
        LRUCache::new(CacheConfig {
            max_size,
            default_ttl_secs: ttl_secs,
            cleanup_interval_secs: 1,
            enable_background_cleanup: false,
        })
    }

    #[tokio::test]
    async fn records_hits_and_misses() {
        let cache = create_test_cache(100, 3600);

        assert!(!cache.record_access("strat_1", false, Some(100)).await);
        assert!(cache.record_access("strat_1", true, None).await);

        let metrics = cache.get_metrics().await;
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hit_rate, 0.5);
    }

    #[tokio::test]
    async fn evicts_least_recently_used_entry() {
        let cache = create_test_cache(3, 3600);

        cache.record_access("a", false, Some(100)).await;
        cache.record_access("b", false, Some(100)).await;
        cache.record_access("c", false, Some(100)).await;
        cache.record_access("d", false, Some(100)).await;

        assert!(!cache.contains("a").await);
        assert!(cache.contains("b").await);
        assert!(cache.contains("c").await);
        assert!(cache.contains("d").await);

        let metrics = cache.get_metrics().await;
        assert_eq!(metrics.item_count, 3);
        assert_eq!(metrics.evictions, 1);
    }

    #[tokio::test]
    async fn touching_an_entry_protects_it_from_eviction() {
        let cache = create_test_cache(3, 3600);

        cache.record_access("a", false, Some(100)).await;
        cache.record_access("b", false, Some(100)).await;
        cache.record_access("c", false, Some(100)).await;
        cache.record_access("a", true, None).await;
        cache.record_access("d", false, Some(100)).await;

        assert!(cache.contains("a").await);
        assert!(!cache.contains("b").await);
        assert!(cache.contains("c").await);
        assert!(cache.contains("d").await);
    }

    #[tokio::test]
    async fn ttl_expiration_is_detected_on_access() {
        let cache = create_test_cache(10, 1);

        cache.record_access("a", false, Some(100)).await;
        assert!(cache.contains("a").await);

        sleep(TokioDuration::from_secs(2)).await;

        assert!(!cache.record_access("a", true, None).await);
        assert_eq!(cache.get_metrics().await.expirations, 1);
        assert!(!cache.contains("a").await);
    }

    #[tokio::test]
    async fn manual_cleanup_removes_expired_entries() {
        let cache = create_test_cache(10, 1);

        cache.record_access("a", false, Some(100)).await;
        cache.record_access("b", false, Some(100)).await;

        sleep(TokioDuration::from_secs(2)).await;

        assert_eq!(cache.cleanup_expired().await, 2);
        assert!(!cache.contains("a").await);
        assert!(!cache.contains("b").await);
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let cache = create_test_cache(10, 0);

        cache.record_access("a", false, Some(100)).await;
        sleep(TokioDuration::from_secs(2)).await;

        assert!(cache.contains("a").await);
        assert!(cache.record_access("a", true, None).await);
    }

    #[tokio::test]
    async fn clear_resets_all_state() {
        let cache = create_test_cache(10, 3600);

        for key in ["a", "b", "c"] {
            cache.record_access(key, false, Some(100)).await;
        }
        assert_eq!(cache.get_metrics().await.item_count, 3);

        cache.clear().await;
        let metrics = cache.get_metrics().await;
        assert_eq!(metrics.item_count, 0);
        assert_eq!(metrics.total_size_bytes, 0);
    }
}
