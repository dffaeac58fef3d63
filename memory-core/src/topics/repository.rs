//! Storage-agnostic persistence contract for topics.

use super::{Topic, TopicMember};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence operations the topic store needs from a backend.
#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn insert(&self, topic: Topic) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Topic>>;
    async fn update(&self, topic: Topic) -> Result<()>;
    /// Active topics ordered by `last_active_at` desc.
    async fn list_active(&self, limit: usize) -> Result<Vec<Topic>>;
    /// Flips `is_active = false` on active topics whose `last_active_at`
    /// is older than `cutoff`; returns the ids affected.
    async fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;

    async fn insert_member(&self, member: TopicMember) -> Result<()>;
    async fn list_members(&self, topic_id: &str) -> Result<Vec<TopicMember>>;
}

/// In-memory reference implementation, `Arc<RwLock<HashMap<..>>>`-backed
/// the same way [`crate::strategic::InMemoryStrategicRepository`] is.
#[derive(Default)]
pub struct InMemoryTopicRepository {
    topics: Arc<RwLock<HashMap<String, Topic>>>,
    members: Arc<RwLock<Vec<TopicMember>>>,
}

impl InMemoryTopicRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopicRepository for InMemoryTopicRepository {
    async fn insert(&self, topic: Topic) -> Result<()> {
        self.topics.write().await.insert(topic.id.clone(), topic);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Topic>> {
        Ok(self.topics.read().await.get(id).cloned())
    }

    async fn update(&self, topic: Topic) -> Result<()> {
        self.topics.write().await.insert(topic.id.clone(), topic);
        Ok(())
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<Topic>> {
        let mut active: Vec<Topic> = self
            .topics
            .read()
            .await
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        active.truncate(limit);
        Ok(active)
    }

    async fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let mut topics = self.topics.write().await;
        let mut affected = Vec::new();
        for topic in topics.values_mut() {
            if topic.is_active && topic.last_active_at < cutoff {
                topic.is_active = false;
                affected.push(topic.id.clone());
            }
        }
        Ok(affected)
    }

    async fn insert_member(&self, member: TopicMember) -> Result<()> {
        self.members.write().await.push(member);
        Ok(())
    }

    async fn list_members(&self, topic_id: &str) -> Result<Vec<TopicMember>> {
        Ok(self
            .members
            .read()
            .await
            .iter()
            .filter(|m| m.topic_id == topic_id)
            .cloned()
            .collect())
    }
}
