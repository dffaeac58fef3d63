//! Public contract of the core memory store.

use super::repository::CoreMemoryRepository;
use super::{
    ChangelogEntry, CustomFact, EntityKind, Preference, ProjectMemory, UserMemory,
    PROJECT_FIELD_ALLOWLIST, USER_FIELD_ALLOWLIST,
};
use crate::config::ResourceLimits;
use crate::types::new_id;
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;

/// User/project profile storage with bounded-growth facts/preferences
/// and an append-only changelog.
pub struct CoreMemoryStore {
    repo: Arc<dyn CoreMemoryRepository>,
    limits: ResourceLimits,
}

impl CoreMemoryStore {
    #[must_use]
    pub fn new(repo: Arc<dyn CoreMemoryRepository>, limits: ResourceLimits) -> Self {
        Self { repo, limits }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserMemory> {
        match self.repo.get_user(user_id).await? {
            Some(user) => Ok(user),
            None => {
                let user = UserMemory::new(user_id);
                self.repo.put_user(user.clone()).await?;
                Ok(user)
            }
        }
    }

    /// Writes one scalar field on a user's profile. Rejects `field`
    /// names outside [`USER_FIELD_ALLOWLIST`] with [`Error::InvalidInput`]
    ///. Records a [`ChangelogEntry`] with the prior value.
    pub async fn update_user_field(
        &self,
        user_id: &str,
        field: &str,
        value: &str,
        source: &str,
    ) -> Result<UserMemory> {
        if !USER_FIELD_ALLOWLIST.contains(&field) {
            return Err(Error::InvalidInput(format!("unknown user field: {field}")));
        }
        let mut user = self.get_user(user_id).await?;
        let old_value = user_field(&user, field).unwrap_or_default();
        set_user_field(&mut user, field, value);
        user.updated_at = Utc::now();
        self.repo.put_user(user.clone()).await?;

        self.repo
            .insert_changelog(ChangelogEntry {
                id: new_id("act"),
                entity_kind: EntityKind::User,
                entity_id: user_id.to_string(),
                field: field.to_string(),
                old_value,
                new_value: value.to_string(),
                source: source.to_string(),
                created_at: Utc::now(),
            })
            .await?;
        Ok(user)
    }

    /// Appends a custom fact, evicting the oldest fact when the list
    /// would exceed `max_user_facts`.
    pub async fn append_fact(&self, user_id: &str, text: &str) -> Result<UserMemory> {
        let mut user = self.get_user(user_id).await?;
        user.custom_facts.push(CustomFact {
            id: new_id("act"),
            text: text.to_string(),
            created_at: Utc::now(),
        });
        if user.custom_facts.len() > self.limits.max_user_facts {
            user.custom_facts.sort_by_key(|f| f.created_at);
            let overflow = user.custom_facts.len() - self.limits.max_user_facts;
            user.custom_facts.drain(0..overflow);
        }
        user.updated_at = Utc::now();
        self.repo.put_user(user.clone()).await?;
        Ok(user)
    }

    /// Adds a preference, evicting the lowest-confidence entry when the
    /// list would exceed `max_preferences`.
    pub async fn add_preference(&self, user_id: &str, text: &str, confidence: f32) -> Result<UserMemory> {
        let mut user = self.get_user(user_id).await?;
        user.preferences.push(Preference {
            id: new_id("act"),
            text: text.to_string(),
            confidence,
            created_at: Utc::now(),
        });
        if user.preferences.len() > self.limits.max_preferences {
            let min_idx = user
                .preferences
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i);
            if let Some(i) = min_idx {
                user.preferences.remove(i);
            }
        }
        user.updated_at = Utc::now();
        self.repo.put_user(user.clone()).await?;
        Ok(user)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<ProjectMemory> {
        match self.repo.get_project(project_id).await? {
            Some(project) => Ok(project),
            None => {
                let project = ProjectMemory::new(project_id);
                self.repo.put_project(project.clone()).await?;
                Ok(project)
            }
        }
    }

    pub async fn update_project_field(
        &self,
        project_id: &str,
        field: &str,
        value: &str,
        source: &str,
    ) -> Result<ProjectMemory> {
        if !PROJECT_FIELD_ALLOWLIST.contains(&field) {
            return Err(Error::InvalidInput(format!("unknown project field: {field}")));
        }
        let mut project = self.get_project(project_id).await?;
        let old_value = project_field(&project, field).unwrap_or_default();
        set_project_field(&mut project, field, value);
        project.updated_at = Utc::now();
        self.repo.put_project(project.clone()).await?;

        self.repo
            .insert_changelog(ChangelogEntry {
                id: new_id("act"),
                entity_kind: EntityKind::Project,
                entity_id: project_id.to_string(),
                field: field.to_string(),
                old_value,
                new_value: value.to_string(),
                source: source.to_string(),
                created_at: Utc::now(),
            })
            .await?;
        Ok(project)
    }

    pub async fn get_changelog(&self, entity_id: &str) -> Result<Vec<ChangelogEntry>> {
        self.repo.list_changelog(entity_id).await
    }
}

fn user_field(user: &UserMemory, field: &str) -> Option<String> {
    match field {
        "name" => user.name.clone(),
        "role" => user.role.clone(),
        "experience" => user.experience.clone(),
        "os" => user.os.clone(),
        "shell" => user.shell.clone(),
        "editor" => user.editor.clone(),
        _ => None,
    }
}

fn set_user_field(user: &mut UserMemory, field: &str, value: &str) {
    let value = Some(value.to_string());
    match field {
        "name" => user.name = value,
        "role" => user.role = value,
        "experience" => user.experience = value,
        "os" => user.os = value,
        "shell" => user.shell = value,
        "editor" => user.editor = value,
        _ => unreachable!("validated against USER_FIELD_ALLOWLIST"),
    }
}

fn project_field(project: &ProjectMemory, field: &str) -> Option<String> {
    match field {
        "name" => project.name.clone(),
        "description" => project.description.clone(),
        "tech_stack" => project.tech_stack.clone(),
        _ => None,
    }
}

fn set_project_field(project: &mut ProjectMemory, field: &str, value: &str) {
    let value = Some(value.to_string());
    match field {
        "name" => project.name = value,
        "description" => project.description = value,
        "tech_stack" => project.tech_stack = value,
        _ => unreachable!("validated against PROJECT_FIELD_ALLOWLIST"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_memory::InMemoryCoreMemoryRepository;

    fn store_with_limits(max_facts: usize, max_prefs: usize) -> CoreMemoryStore {
        CoreMemoryStore::new(
            Arc::new(InMemoryCoreMemoryRepository::new()),
            ResourceLimits {
                max_user_facts: max_facts,
                max_preferences: max_prefs,
            },
        )
    }

    #[tokio::test]
    async fn get_user_lazily_creates_profile() {
        let store = store_with_limits(20, 15);
        let user = store.get_user("u1").await.unwrap();
        assert_eq!(user.user_id, "u1");
        assert!(user.name.is_none());
    }

    #[tokio::test]
    async fn update_user_field_rejects_unknown_field() {
        let store = store_with_limits(20, 15);
        let err = store
            .update_user_field("u1", "favorite_color", "blue", "tool")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_user_field_writes_changelog_with_prior_value() {
        let store = store_with_limits(20, 15);
        store.update_user_field("u1", "shell", "bash", "tool").await.unwrap();
        store.update_user_field("u1", "shell", "zsh", "tool").await.unwrap();
        let log = store.get_changelog("u1").await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].old_value, "bash");
        assert_eq!(log[1].new_value, "zsh");
    }

    #[tokio::test]
    async fn append_fact_evicts_oldest_on_overflow() {
        let store = store_with_limits(2, 15);
        store.append_fact("u1", "fact one").await.unwrap();
        store.append_fact("u1", "fact two").await.unwrap();
        let user = store.append_fact("u1", "fact three").await.unwrap();
        assert_eq!(user.custom_facts.len(), 2);
        assert_eq!(user.custom_facts[0].text, "fact two");
        assert_eq!(user.custom_facts[1].text, "fact three");
    }

    #[tokio::test]
    async fn add_preference_evicts_lowest_confidence_on_overflow() {
        let store = store_with_limits(20, 2);
        store.add_preference("u1", "likes tabs", 0.9).await.unwrap();
        store.add_preference("u1", "likes dark mode", 0.2).await.unwrap();
        let user = store.add_preference("u1", "likes vim", 0.7).await.unwrap();
        assert_eq!(user.preferences.len(), 2);
        assert!(user.preferences.iter().all(|p| p.text != "likes dark mode"));
    }

    #[tokio::test]
    async fn update_project_field_rejects_unknown_field() {
        let store = store_with_limits(20, 15);
        let err = store
            .update_project_field("p1", "owner", "alice", "tool")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_project_field_round_trips() {
        let store = store_with_limits(20, 15);
        store
            .update_project_field("p1", "tech_stack", "rust", "tool")
            .await
            .unwrap();
        let project = store.get_project("p1").await.unwrap();
        assert_eq!(project.tech_stack.as_deref(), Some("rust"));
    }
}
