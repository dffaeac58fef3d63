//! Three-tier observational compression pipeline: Messages, consumed by
//! the Observer into Observations, consumed by the Reflector into
//! Reflections.

mod observer;
mod reflector;
mod repository;
mod store;

pub use observer::Observer;
pub use reflector::Reflector;
pub use repository::{InMemoryObservationalRepository, ObservationalRepository};
pub use store::ObservationalStore;

use crate::types::PatternTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tier 1: an append-only working-set message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub resource_id: String,
    pub role: String,
    pub content: String,
    pub token_count: u32,
    pub compressed: bool,
    pub obs_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tier 2: a compressed summary of a message run, produced by the
/// [`Observer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub thread_id: String,
    pub resource_id: String,
    pub priority: crate::types::ObservationPriority,
    pub task_state: String,
    pub consumed_message_ids: Vec<String>,
    pub token_count: u32,
    pub reflected: bool,
    pub ref_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tier 3: a distilled pattern produced by the [`Reflector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reflection {
    pub id: String,
    pub resource_id: String,
    pub pattern_tag: PatternTag,
    pub content: String,
    pub consumed_observation_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Estimates token count the same way used throughout the observational
/// pipeline: `char_count / 4`, rounded up.
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}
