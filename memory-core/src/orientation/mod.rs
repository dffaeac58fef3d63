//! Wake-up context assembly and identity profile.
//!
//! Split into a small entity file (this module), an identity sub-store,
//! a session-history reader with a filesystem fallback, and a store
//! that fans both out into a single preamble.

mod identity;
pub mod sessions;
mod store;

pub use identity::{IdentityRepository, IdentityStore, InMemoryIdentityRepository, IDENTITY_FIELD_ALLOWLIST};
pub use sessions::{InMemorySessionRepository, Session, SessionRepository};
pub use store::{generate_system_preamble, OrientationContext, OrientationStore};

use serde::{Deserialize, Serialize};

/// Durable assistant identity profile, distinct from [`crate::core_memory::UserMemory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    /// JSON-serialized list of strings.
    pub core_values: Vec<String>,
    pub current_goal: Option<String>,
    pub mood: Option<String>,
    pub persona_prompt: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            role: None,
            core_values: Vec::new(),
            current_goal: None,
            mood: None,
            persona_prompt: None,
        }
    }
}
