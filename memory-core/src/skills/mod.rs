//! Skill library: reusable action patterns distilled from
//! successful execution traces, tracked with a Beta(1,1) Bayesian
//! success rate kept deliberately distinct from the strategic store's
//! frequentist rate.

pub mod confidence;
pub mod naming;
mod repository;
mod store;

pub use repository::{InMemorySkillRepository, SkillRepository};
pub use store::SkillStore;

use crate::types::SkillSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A learned, reusable action pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub pattern: String,
    /// JSON Schema (serialized) describing the inputs `pattern` expects.
    pub input_schema: String,
    pub examples: Vec<String>,
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub success_count: u32,
    pub failure_count: u32,
    pub confidence: f32,
    pub source: SkillSource,
    pub session_id: Option<String>,
    pub version: u32,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub access_count: u32,
}

impl StoredSkill {
    /// Beta(1,1) posterior-mean success rate.
    #[must_use]
    pub fn bayesian_success_rate(&self) -> f64 {
        confidence::bayesian_success_rate(self.success_count, self.failure_count)
    }
}

/// Input to `LearnFromExecution`: a completed agent execution trace.
#[derive(Debug, Clone)]
pub struct ExecutionTrace {
    pub task_summary: String,
    pub generated_code: String,
    pub user_input: String,
    pub detected_tags: Vec<String>,
    pub confidence: f32,
    /// Session the trace was observed in, if any.
    pub session_id: Option<String>,
    /// JSON Schema (serialized) describing the inputs `generated_code`
    /// expects; defaults to `"{}"` when the caller has none to offer.
    pub input_schema: String,
}
