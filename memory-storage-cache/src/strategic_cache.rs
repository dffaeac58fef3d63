//! Typed strategic-memory reads/writes over [`crate::CacheStorage`]'s
//! redb-backed `strategic_memory` and `hot_lists` tables.

use crate::{CacheStorage, HOT_LISTS_TABLE, STRATEGIC_TABLE};
use memory_core::strategic::StrategicMemory;
use memory_core::{Error, Result};

const TOP_PRINCIPLES_KEY: &str = "top_principles";

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value).map_err(|e| Error::StoreFailure(format!("cache encode failed: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    postcard::from_bytes(bytes).map_err(|e| Error::StoreFailure(format!("cache decode failed: {e}")))
}

impl CacheStorage {
    /// Caches a single strategic memory, keyed by id.
    pub async fn cache_memory(&self, memory: &StrategicMemory) -> Result<()> {
        let bytes = encode(memory)?;
        let size = bytes.len();
        self.put_bytes(STRATEGIC_TABLE, memory.id.clone(), bytes).await?;
        self.tracker.record_access(&memory.id, false, Some(size)).await;
        Ok(())
    }

    /// Returns the cached memory for `id`, if warm, recording the hit for
    /// the LRU tracker.
    pub async fn get_cached_memory(&self, id: &str) -> Result<Option<StrategicMemory>> {
        match self.get_bytes(STRATEGIC_TABLE, id.to_string()).await? {
            Some(bytes) => {
                self.tracker.record_access(id, true, None).await;
                Ok(Some(decode(&bytes)?))
            }
            None => {
                self.tracker.record_access(id, false, None).await;
                Ok(None)
            }
        }
    }

    /// Drops a memory from the cache; called on `RecordSuccess`,
    /// `RecordFailure`, `UpdateConfidence`, and `Delete`.
    pub async fn invalidate_memory(&self, id: &str) -> Result<()> {
        self.delete_bytes(STRATEGIC_TABLE, id.to_string()).await?;
        self.tracker.remove(id).await;
        Ok(())
    }

    /// Caches the result of `list_top_by_confidence` under a fixed key.
    pub async fn cache_top_principles(&self, memories: &[StrategicMemory]) -> Result<()> {
        let bytes = encode(&memories)?;
        self.put_bytes(HOT_LISTS_TABLE, TOP_PRINCIPLES_KEY.to_string(), bytes).await
    }

    pub async fn get_cached_top_principles(&self) -> Result<Option<Vec<StrategicMemory>>> {
        match self.get_bytes(HOT_LISTS_TABLE, TOP_PRINCIPLES_KEY.to_string()).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn invalidate_top_principles(&self) -> Result<()> {
        self.delete_bytes(HOT_LISTS_TABLE, TOP_PRINCIPLES_KEY.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memory_core::types::MemoryTier;
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
            embedding: Some(vec![0.1, 0.2]),
            created_at: now,
            updated_at: now,
            last_applied_at: None,
            version: 1,
            parent_id: None,
            evolution_chain: Vec::new(),
        }
    }

    #[tokio::test]
    async fn caches_and_invalidates_a_memory() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(&dir.path().join("cache.redb")).await.unwrap();
        let memory = sample("strat_1");

        storage.cache_memory(&memory).await.unwrap();
        let cached = storage.get_cached_memory("strat_1").await.unwrap().unwrap();
        assert_eq!(cached.principle, memory.principle);

        storage.invalidate_memory("strat_1").await.unwrap();
        assert!(storage.get_cached_memory("strat_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn caches_top_principles_list() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(&dir.path().join("cache.redb")).await.unwrap();
        let memories = vec![sample("strat_1"), sample("strat_2")];

        storage.cache_top_principles(&memories).await.unwrap();
        let cached = storage.get_cached_top_principles().await.unwrap().unwrap();
        assert_eq!(cached.len(), 2);

        storage.invalidate_top_principles().await.unwrap();
        assert!(storage.get_cached_top_principles().await.unwrap().is_none());
    }
}
