//! Cache-aside wrapper splitting a fast embedded cache from a durable
//! SQL store: hot reads are served from the embedded cache first,
//! everything else and every write goes straight to the inner store,
//! with the cache invalidated on writes (`RecordSuccess`,
//! `RecordFailure`, `UpdateConfidence`, `Delete`) so it never goes stale.

use crate::CacheStorage;
use async_trait::async_trait;
use memory_core::strategic::{ActivationLog, OutcomeAttribution, PromotionNarrative, StrategicMemory, StrategicRepository};
use memory_core::types::MemoryTier;
use memory_core::Result;
use std::sync::Arc;
use tracing::debug;

/// Wraps any [`StrategicRepository`] with a redb-backed hot-read cache.
///
/// `get` and `list_top_by_confidence` check the cache first; every other
/// read passes straight through to `inner`. Writes (`insert`, `update`,
/// `delete`) go to `inner` first and then invalidate the affected cache
/// entries, so a reader never observes a cached value older than the
/// latest committed write.
pub struct CachedStrategicRepository<R: StrategicRepository> {
    inner: R,
    cache: Arc<CacheStorage>,
}

impl<R: StrategicRepository> CachedStrategicRepository<R> {
    pub fn new(inner: R, cache: Arc<CacheStorage>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<R: StrategicRepository> StrategicRepository for CachedStrategicRepository<R> {
    async fn insert(&self, mem: StrategicMemory) -> Result<()> {
        self.inner.insert(mem.clone()).await?;
        self.cache.cache_memory(&mem).await?;
        self.cache.invalidate_top_principles().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StrategicMemory>> {
        if let Some(hit) = self.cache.get_cached_memory(id).await? {
            debug!(id, "strategic memory cache hit");
            return Ok(Some(hit));
        }
        let fetched = self.inner.get(id).await?;
        if let Some(mem) = &fetched {
            self.cache.cache_memory(mem).await?;
        }
        Ok(fetched)
    }

    async fn update(&self, mem: StrategicMemory) -> Result<()> {
        self.inner.update(mem.clone()).await?;
        self.cache.invalidate_memory(&mem.id).await?;
        self.cache.invalidate_top_principles().await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await?;
        self.cache.invalidate_memory(id).await?;
        self.cache.invalidate_top_principles().await?;
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.inner.list(limit).await
    }

    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.inner.list_by_category(category, limit).await
    }

    async fn list_by_tier(&self, tier: MemoryTier, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.inner.list_by_tier(tier, limit).await
    }

    async fn list_top_by_confidence(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        if let Some(hit) = self.cache.get_cached_top_principles().await? {
            if hit.len() >= limit {
                debug!(limit, "top principles cache hit");
                return Ok(hit.into_iter().take(limit).collect());
            }
        }
        let fetched = self.inner.list_top_by_confidence(limit).await?;
        self.cache.cache_top_principles(&fetched).await?;
        Ok(fetched)
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<StrategicMemory>> {
        self.inner.list_children(parent_id).await
    }

    async fn search_fts(&self, fts_query: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.inner.search_fts(fts_query, limit).await
    }

    async fn insert_narrative(&self, narrative: PromotionNarrative) -> Result<()> {
        self.inner.insert_narrative(narrative).await
    }

    async fn insert_attribution(&self, attribution: OutcomeAttribution) -> Result<()> {
        self.inner.insert_attribution(attribution).await
    }

    async fn list_attributions(&self, memory_id: &str) -> Result<Vec<OutcomeAttribution>> {
        self.inner.list_attributions(memory_id).await
    }

    async fn insert_activation_log(&self, log: ActivationLog) -> Result<()> {
        self.inner.insert_activation_log(log).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memory_core::strategic::InMemoryStrategicRepository;
    use tempfile::TempDir;

    fn sample(id: &str) -> StrategicMemory {
        let now = Utc::now();
        StrategicMemory {
            id: id.to_string(),
            principle: "test principle".to_string(),
            category: "testing".to_string(),
            trigger_pattern: "writing a test".to_string(),
            tier: MemoryTier::Tentative,
            success_count: 0,
            failure_count: 0,
            apply_count: 0,
            confidence: 0.5,
            source_sessions: Vec::new(),
            embedding: None,
            created_at: now,
            updated_at: now,
            last_applied_at: None,
            version: 1,
            parent_id: None,
            evolution_chain: Vec::new(),
        }
    }

    async fn cached_repo(dir: &TempDir) -> CachedStrategicRepository<InMemoryStrategicRepository> {
        let cache = CacheStorage::new(&dir.path().join("cache.redb")).await.unwrap();
        CachedStrategicRepository::new(InMemoryStrategicRepository::new(), Arc::new(cache))
    }

    #[tokio::test]
    async fn get_warms_the_cache_on_miss_and_serves_it_on_hit() {
        let dir = TempDir::new().unwrap();
        let repo = cached_repo(&dir).await;
        repo.inner.insert(sample("strat_1")).await.unwrap();

        assert!(repo.cache.get_cached_memory("strat_1").await.unwrap().is_none());
        let fetched = repo.get("strat_1").await.unwrap().unwrap();
        assert_eq!(fetched.id, "strat_1");
        assert!(repo.cache.get_cached_memory("strat_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_invalidates_the_cached_entry() {
        let dir = TempDir::new().unwrap();
        let repo = cached_repo(&dir).await;
        let mem = sample("strat_1");
        repo.insert(mem.clone()).await.unwrap();
        assert!(repo.cache.get_cached_memory("strat_1").await.unwrap().is_some());

        let mut updated = mem;
        updated.confidence = 0.9;
        repo.update(updated).await.unwrap();

        assert!(repo.cache.get_cached_memory("strat_1").await.unwrap().is_none());
        let refetched = repo.get("strat_1").await.unwrap().unwrap();
        assert!((refetched.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn delete_invalidates_the_cached_entry() {
        let dir = TempDir::new().unwrap();
        let repo = cached_repo(&dir).await;
        repo.insert(sample("strat_1")).await.unwrap();

        repo.delete("strat_1").await.unwrap();

        assert!(repo.cache.get_cached_memory("strat_1").await.unwrap().is_none());
        assert!(repo.get("strat_1").await.unwrap().is_none());
    }
}
