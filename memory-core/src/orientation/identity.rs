//! Identity profile storage.

use super::Identity;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Field names [`IdentityStore::update_identity`] accepts.
/// Deliberately distinct from [`crate::core_memory::USER_FIELD_ALLOWLIST`].
pub const IDENTITY_FIELD_ALLOWLIST: &[&str] =
    &["name", "role", "core_values", "current_goal", "mood", "persona_prompt"];

/// Persistence contract for the identity profile.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Identity>>;
    async fn put(&self, identity: Identity) -> Result<()>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct InMemoryIdentityRepository {
    identities: Arc<RwLock<HashMap<String, Identity>>>,
}

impl InMemoryIdentityRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn get(&self, user_id: &str) -> Result<Option<Identity>> {
        Ok(self.identities.read().await.get(user_id).cloned())
    }

    async fn put(&self, identity: Identity) -> Result<()> {
        self.identities.write().await.insert(identity.user_id.clone(), identity);
        Ok(())
    }
}

/// Validated read/write access to the identity profile.
pub struct IdentityStore {
    repo: Arc<dyn IdentityRepository>,
}

impl IdentityStore {
    #[must_use]
    pub fn new(repo: Arc<dyn IdentityRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_or_create(&self, user_id: &str) -> Result<Identity> {
        match self.repo.get(user_id).await? {
            Some(identity) => Ok(identity),
            None => {
                let identity = Identity::new(user_id);
                self.repo.put(identity.clone()).await?;
                Ok(identity)
            }
        }
    }

    /// Validates every key in `fields` against [`IDENTITY_FIELD_ALLOWLIST`]
    /// before writing any of them.
    /// `core_values` is parsed as a JSON array of strings.
    pub async fn update_identity(&self, user_id: &str, fields: &HashMap<String, String>) -> Result<Identity> {
        for key in fields.keys() {
            if !IDENTITY_FIELD_ALLOWLIST.contains(&key.as_str()) {
                return Err(Error::InvalidInput(format!("unknown identity field: {key}")));
            }
        }

        let mut identity = self.get_or_create(user_id).await?;
        for (key, value) in fields {
            match key.as_str() {
                "name" => identity.name = Some(value.clone()),
                "role" => identity.role = Some(value.clone()),
                "current_goal" => identity.current_goal = Some(value.clone()),
                "mood" => identity.mood = Some(value.clone()),
                "persona_prompt" => identity.persona_prompt = Some(value.clone()),
                "core_values" => identity.core_values = serde_json::from_str(value)?,
                _ => unreachable!("validated above"),
            }
        }
        self.repo.put(identity.clone()).await?;
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> IdentityStore {
        IdentityStore::new(Arc::new(InMemoryIdentityRepository::new()))
    }

    #[tokio::test]
    async fn get_or_create_returns_blank_profile() {
        let store = store();
        let identity = store.get_or_create("user_1").await.unwrap();
        assert_eq!(identity.user_id, "user_1");
        assert!(identity.name.is_none());
    }

    #[tokio::test]
    async fn update_identity_rejects_unknown_field() {
        let store = store();
        let mut fields = HashMap::new();
        fields.insert("timezone".to_string(), "UTC".to_string());
        let err = store.update_identity("user_1", &fields).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_identity_parses_core_values_json() {
        let store = store();
        let mut fields = HashMap::new();
        fields.insert("core_values".to_string(), r#"["curiosity","rigor"]"#.to_string());
        let identity = store.update_identity("user_1", &fields).await.unwrap();
        assert_eq!(identity.core_values, vec!["curiosity".to_string(), "rigor".to_string()]);
    }

    #[tokio::test]
    async fn update_identity_is_atomic_on_validation_failure() {
        let store = store();
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "Ada".to_string());
        fields.insert("bogus".to_string(), "x".to_string());
        assert!(store.update_identity("user_1", &fields).await.is_err());
        let identity = store.get_or_create("user_1").await.unwrap();
        assert!(identity.name.is_none());
    }
}
