//! Storage-agnostic persistence contract for core memory.

use super::{ChangelogEntry, ProjectMemory, UserMemory};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence operations the core memory store needs from a backend.
#[async_trait]
pub trait CoreMemoryRepository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserMemory>>;
    async fn put_user(&self, user: UserMemory) -> Result<()>;

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectMemory>>;
    async fn put_project(&self, project: ProjectMemory) -> Result<()>;

    async fn insert_changelog(&self, entry: ChangelogEntry) -> Result<()>;
    async fn list_changelog(&self, entity_id: &str) -> Result<Vec<ChangelogEntry>>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct InMemoryCoreMemoryRepository {
    users: Arc<RwLock<HashMap<String, UserMemory>>>,
    projects: Arc<RwLock<HashMap<String, ProjectMemory>>>,
    changelog: Arc<RwLock<Vec<ChangelogEntry>>>,
}

impl InMemoryCoreMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoreMemoryRepository for InMemoryCoreMemoryRepository {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserMemory>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn put_user(&self, user: UserMemory) -> Result<()> {
        self.users.write().await.insert(user.user_id.clone(), user);
        Ok(())
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectMemory>> {
        Ok(self.projects.read().await.get(project_id).cloned())
    }

    async fn put_project(&self, project: ProjectMemory) -> Result<()> {
        self.projects
            .write()
            .await
            .insert(project.project_id.clone(), project);
        Ok(())
    }

    async fn insert_changelog(&self, entry: ChangelogEntry) -> Result<()> {
        self.changelog.write().await.push(entry);
        Ok(())
    }

    async fn list_changelog(&self, entity_id: &str) -> Result<Vec<ChangelogEntry>> {
        Ok(self
            .changelog
            .read()
            .await
            .iter()
            .filter(|c| c.entity_id == entity_id)
            .cloned()
            .collect())
    }
}
