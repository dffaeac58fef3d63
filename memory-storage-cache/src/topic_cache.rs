//! Typed topic-centroid reads/writes over [`crate::CacheStorage`]'s
//! `topic_centroids` table.

use crate::{CacheStorage, TOPIC_CENTROID_TABLE};
use memory_core::topics::Topic;
use memory_core::Result;

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value)
        .map_err(|e| memory_core::Error::StoreFailure(format!("cache encode failed: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    postcard::from_bytes(bytes)
        .map_err(|e| memory_core::Error::StoreFailure(format!("cache decode failed: {e}")))
}

impl CacheStorage {
    pub async fn cache_topic(&self, topic: &Topic) -> Result<()> {
        let bytes = encode(topic)?;
        let size = bytes.len();
        self.put_bytes(TOPIC_CENTROID_TABLE, topic.id.clone(), bytes).await?;
        self.tracker.record_access(&topic.id, false, Some(size)).await;
        Ok(())
    }

    pub async fn get_cached_topic(&self, id: &str) -> Result<Option<Topic>> {
        match self.get_bytes(TOPIC_CENTROID_TABLE, id.to_string()).await? {
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

    pub async fn invalidate_topic(&self, id: &str) -> Result<()> {
        self.delete_bytes(TOPIC_CENTROID_TABLE, id.to_string()).await?;
        self.tracker.remove(id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample(id: &str) -> Topic {
        let now = Utc::now();
        Topic {
            id: id.to_string(),
            name: "error handling".to_string(),
            description: "principles about propagating failures".to_string(),
            keywords: vec!["error".to_string()],
            centroid: vec![0.1, 0.2, 0.3],
            member_count: 1,
            is_active: true,
            created_at: now,
            last_active_at: now,
        }
    }

    #[tokio::test]
    async fn caches_and_invalidates_a_topic_centroid() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(&dir.path().join("cache.redb")).await.unwrap();
        let topic = sample("topic_1");

        storage.cache_topic(&topic).await.unwrap();
        let cached = storage.get_cached_topic("topic_1").await.unwrap().unwrap();
        assert_eq!(cached.centroid, topic.centroid);

        storage.invalidate_topic("topic_1").await.unwrap();
        assert!(storage.get_cached_topic("topic_1").await.unwrap().is_none());
    }
}
