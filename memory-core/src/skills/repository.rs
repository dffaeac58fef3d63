//! Storage-agnostic persistence contract for skills.

use super::StoredSkill;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence operations the skill store needs from a backend.
#[async_trait]
pub trait SkillRepository: Send + Sync {
    async fn insert(&self, skill: StoredSkill) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<StoredSkill>>;
    async fn update(&self, skill: StoredSkill) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;

    /// All skills carrying a non-null embedding.
    async fn list_with_embeddings(&self) -> Result<Vec<StoredSkill>>;
    /// Case-insensitive substring scan over `name`/`description`/`tags`,
    /// used as the fallback path when semantic search is unavailable.
    async fn search_text(&self, query: &str) -> Result<Vec<StoredSkill>>;
    /// Direct children (`parent_id == id`), ordered by version desc.
    async fn list_children(&self, parent_id: &str) -> Result<Vec<StoredSkill>>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct InMemorySkillRepository {
    skills: Arc<RwLock<HashMap<String, StoredSkill>>>,
}

impl InMemorySkillRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SkillRepository for InMemorySkillRepository {
    async fn insert(&self, skill: StoredSkill) -> Result<()> {
        self.skills.write().await.insert(skill.id.clone(), skill);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredSkill>> {
        Ok(self.skills.read().await.get(id).cloned())
    }

    async fn update(&self, skill: StoredSkill) -> Result<()> {
        self.skills.write().await.insert(skill.id.clone(), skill);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.skills.write().await.remove(id);
        Ok(())
    }

    async fn list_with_embeddings(&self) -> Result<Vec<StoredSkill>> {
        Ok(self
            .skills
            .read()
            .await
            .values()
            .filter(|s| s.embedding.is_some())
            .cloned()
            .collect())
    }

    async fn search_text(&self, query: &str) -> Result<Vec<StoredSkill>> {
        let needle = query.to_lowercase();
        Ok(self
            .skills
            .read()
            .await
            .values()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.description.to_lowercase().contains(&needle)
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<StoredSkill>> {
        let mut children: Vec<StoredSkill> = self
            .skills
            .read()
            .await
            .values()
            .filter(|s| s.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(children)
    }
}
