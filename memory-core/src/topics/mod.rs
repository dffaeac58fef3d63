//! Topic clustering over strategic-memory embeddings.

pub mod dbscan;
mod repository;
mod store;

pub use repository::{InMemoryTopicRepository, TopicRepository};
pub use store::TopicStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named cluster of strategic memories that share a semantic theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub centroid: Vec<f32>,
    pub member_count: usize,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// One strategic-memory's membership in a [`Topic`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicMember {
    pub topic_id: String,
    pub memory_id: String,
    /// Kind of entity `memory_id` refers to (e.g. `"strategic"`); the
    /// association is typed so a topic may one day cluster more than
    /// one store's rows.
    pub memory_type: String,
    pub created_at: DateTime<Utc>,
    /// Similarity of this member to the topic centroid at insertion time.
    pub relevance: f32,
}

/// Reserved cluster id used by [`dbscan::run`] for noise points.
pub const NOISE_CLUSTER_ID: isize = -1;
