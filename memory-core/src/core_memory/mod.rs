//! User/project profile storage with a bounded fact/preference list and
//! an append-only changelog ( "UserMemory/ProjectMemory (Core)").

mod repository;
mod store;

pub use repository::{CoreMemoryRepository, InMemoryCoreMemoryRepository};
pub use store::CoreMemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field names a caller may write via [`CoreMemoryStore::update_user_field`].
pub const USER_FIELD_ALLOWLIST: &[&str] = &["name", "role", "experience", "os", "shell", "editor"];

/// Field names a caller may write via [`CoreMemoryStore::update_project_field`].
pub const PROJECT_FIELD_ALLOWLIST: &[&str] = &["name", "description", "tech_stack"];

/// A user-scoped custom fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFact {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A user-scoped preference with a confidence weight, used to decide
/// which entry is evicted first on overflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    pub text: String,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

/// Per-user profile: scalar fields plus bounded-growth preference/fact
/// lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMemory {
    pub user_id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub experience: Option<String>,
    pub os: Option<String>,
    pub shell: Option<String>,
    pub editor: Option<String>,
    pub preferences: Vec<Preference>,
    pub custom_facts: Vec<CustomFact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserMemory {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            name: None,
            role: None,
            experience: None,
            os: None,
            shell: None,
            editor: None,
            preferences: Vec::new(),
            custom_facts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-project profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMemory {
    pub project_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tech_stack: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectMemory {
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.into(),
            name: None,
            description: None,
            tech_stack: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Which core-memory entity a [`ChangelogEntry`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Project,
}

/// An append-only audit row recording one scalar-field write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}
