//! Typed skill reads/writes over [`crate::CacheStorage`]'s `skills` and
//! `hot_lists` tables.

use crate::{CacheStorage, HOT_LISTS_TABLE, SKILL_TABLE};
use memory_core::skills::StoredSkill;
use memory_core::Result;

const RECENT_SKILLS_KEY: &str = "recent_skills";

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value)
        .map_err(|e| memory_core::Error::StoreFailure(format!("cache encode failed: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    postcard::from_bytes(bytes)
        .map_err(|e| memory_core::Error::StoreFailure(format!("cache decode failed: {e}")))
}

impl CacheStorage {
    pub async fn cache_skill(&self, skill: &StoredSkill) -> Result<()> {
        let bytes = encode(skill)?;
        let size = bytes.len();
        self.put_bytes(SKILL_TABLE, skill.id.clone(), bytes).await?;
        self.tracker.record_access(&skill.id, false, Some(size)).await;
        Ok(())
    }

    pub async fn get_cached_skill(&self, id: &str) -> Result<Option<StoredSkill>> {
        match self.get_bytes(SKILL_TABLE, id.to_string()).await? {
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

    pub async fn invalidate_skill(&self, id: &str) -> Result<()> {
        self.delete_bytes(SKILL_TABLE, id.to_string()).await?;
        self.tracker.remove(id).await;
        Ok(())
    }

    pub async fn cache_recent_skills(&self, skills: &[StoredSkill]) -> Result<()> {
        let bytes = encode(&skills)?;
        self.put_bytes(HOT_LISTS_TABLE, RECENT_SKILLS_KEY.to_string(), bytes).await
    }

    pub async fn get_cached_recent_skills(&self) -> Result<Option<Vec<StoredSkill>>> {
        match self.get_bytes(HOT_LISTS_TABLE, RECENT_SKILLS_KEY.to_string()).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn invalidate_recent_skills(&self) -> Result<()> {
        self.delete_bytes(HOT_LISTS_TABLE, RECENT_SKILLS_KEY.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memory_core::types::SkillSource;
    use tempfile::TempDir;

    fn sample(id: &str) -> StoredSkill {
        let now = Utc::now();
        StoredSkill {
            id: id.to_string(),
            name: "retry-with-backoff".to_string(),
            description: "Retries a flaky network call with exponential backoff".to_string(),
            pattern: "wrap the call in a retry loop".to_string(),
            input_schema: "{}".to_string(),
            examples: Vec::new(),
            tags: vec!["networking".to_string()],
            embedding: None,
            success_count: 2,
            failure_count: 0,
            confidence: 0.7,
            source: SkillSource::Execution,
            session_id: None,
            version: 1,
            parent_id: None,
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
            access_count: 0,
        }
    }

    #[tokio::test]
    async fn caches_and_invalidates_a_skill() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(&dir.path().join("cache.redb")).await.unwrap();
        let skill = sample("skill_1");

        storage.cache_skill(&skill).await.unwrap();
        let cached = storage.get_cached_skill("skill_1").await.unwrap().unwrap();
        assert_eq!(cached.name, skill.name);

        storage.invalidate_skill("skill_1").await.unwrap();
        assert!(storage.get_cached_skill("skill_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn caches_recent_skills_list() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(&dir.path().join("cache.redb")).await.unwrap();
        let skills = vec![sample("skill_1"), sample("skill_2")];

        storage.cache_recent_skills(&skills).await.unwrap();
        let cached = storage.get_cached_recent_skills().await.unwrap().unwrap();
        assert_eq!(cached.len(), 2);

        storage.invalidate_recent_skills().await.unwrap();
        assert!(storage.get_cached_recent_skills().await.unwrap().is_none());
    }
}
