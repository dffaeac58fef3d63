//! Storage-agnostic persistence contract for the observational pipeline.

use super::{Message, Observation, Reflection};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence operations the observational store needs from a backend.
#[async_trait]
pub trait ObservationalRepository: Send + Sync {
    async fn insert_message(&self, message: Message) -> Result<()>;
    /// Uncompressed messages for `(thread_id, resource_id)`, ordered by
    /// `created_at` ascending, capped at `limit`.
    async fn get_messages(&self, thread_id: &str, resource_id: &str, limit: usize) -> Result<Vec<Message>>;
    /// Sum of `token_count` across uncompressed messages for the key.
    async fn get_message_token_count(&self, thread_id: &str, resource_id: &str) -> Result<u32>;
    async fn mark_messages_compressed(&self, ids: &[String], obs_id: &str) -> Result<()>;

    async fn insert_observation(&self, observation: Observation) -> Result<()>;
    /// Unreflected observations for `resource_id`, ordered by priority
    /// desc then timestamp desc, capped at `limit`.
    async fn get_observations(&self, resource_id: &str, limit: usize) -> Result<Vec<Observation>>;
    /// Sum of `token_count` across unreflected observations for the
    /// resource.
    async fn get_unreflected_observation_token_count(&self, resource_id: &str) -> Result<u32>;
    async fn count_unreflected_observations(&self, resource_id: &str) -> Result<usize>;
    async fn mark_observations_reflected(&self, ids: &[String], ref_id: &str) -> Result<()>;

    async fn insert_reflection(&self, reflection: Reflection) -> Result<()>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct InMemoryObservationalRepository {
    messages: Arc<RwLock<HashMap<String, Message>>>,
    observations: Arc<RwLock<HashMap<String, Observation>>>,
    reflections: Arc<RwLock<Vec<Reflection>>>,
}

impl InMemoryObservationalRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObservationalRepository for InMemoryObservationalRepository {
    async fn insert_message(&self, message: Message) -> Result<()> {
        self.messages.write().await.insert(message.id.clone(), message);
        Ok(())
    }

    async fn get_messages(&self, thread_id: &str, resource_id: &str, limit: usize) -> Result<Vec<Message>> {
        let mut matches: Vec<Message> = self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.thread_id == thread_id && m.resource_id == resource_id && !m.compressed)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn get_message_token_count(&self, thread_id: &str, resource_id: &str) -> Result<u32> {
        Ok(self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.thread_id == thread_id && m.resource_id == resource_id && !m.compressed)
            .map(|m| m.token_count)
            .sum())
    }

    async fn mark_messages_compressed(&self, ids: &[String], obs_id: &str) -> Result<()> {
        let mut messages = self.messages.write().await;
        for id in ids {
            if let Some(message) = messages.get_mut(id) {
                message.compressed = true;
                message.obs_id = Some(obs_id.to_string());
            }
        }
        Ok(())
    }

    async fn insert_observation(&self, observation: Observation) -> Result<()> {
        self.observations
            .write()
            .await
            .insert(observation.id.clone(), observation);
        Ok(())
    }

    async fn get_observations(&self, resource_id: &str, limit: usize) -> Result<Vec<Observation>> {
        let mut matches: Vec<Observation> = self
            .observations
            .read()
            .await
            .values()
            .filter(|o| o.resource_id == resource_id && !o.reflected)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| b.created_at.cmp(&a.created_at)));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn get_unreflected_observation_token_count(&self, resource_id: &str) -> Result<u32> {
        Ok(self
            .observations
            .read()
            .await
            .values()
            .filter(|o| o.resource_id == resource_id && !o.reflected)
            .map(|o| o.token_count)
            .sum())
    }

    async fn count_unreflected_observations(&self, resource_id: &str) -> Result<usize> {
        Ok(self
            .observations
            .read()
            .await
            .values()
            .filter(|o| o.resource_id == resource_id && !o.reflected)
            .count())
    }

    async fn mark_observations_reflected(&self, ids: &[String], ref_id: &str) -> Result<()> {
        let mut observations = self.observations.write().await;
        for id in ids {
            if let Some(observation) = observations.get_mut(id) {
                observation.reflected = true;
                observation.ref_id = Some(ref_id.to_string());
            }
        }
        Ok(())
    }

    async fn insert_reflection(&self, reflection: Reflection) -> Result<()> {
        self.reflections.write().await.push(reflection);
        Ok(())
    }
}
