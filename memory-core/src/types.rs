//! Shared closed-set enums and id helpers used across stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generates a type-prefixed string id, e.g. `strat_<uuid>`.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4())
}

/// Promotion lattice for a [`crate::strategic::StrategicMemory`].
///
/// Ordered `Tentative < Candidate < Proven < Identity`; promotion is
/// monotone (see [`crate::strategic::tier::promote_if_eligible`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    Tentative,
    Candidate,
    Proven,
    Identity,
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryTier::Tentative => "tentative",
            MemoryTier::Candidate => "candidate",
            MemoryTier::Proven => "proven",
            MemoryTier::Identity => "identity",
        };
        write!(f, "{s}")
    }
}

/// Outcome of an attributed retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Partial,
}

/// How a query was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalType {
    Similarity,
    Fts,
    Category,
    Tier,
}

/// Retrieval mode: `Fast` for minimal context/passive retrieval only,
/// `Smart` for full context and LLM-invoked tools (Glossary, "Lane").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Fast,
    Smart,
}

/// Kind of content the next-scene predictor fans out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeType {
    Text,
    Skill,
    Tool,
}

/// Priority of an observation, 1 (low) .. 5 (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationPriority(pub u8);

impl ObservationPriority {
    /// Clamp an arbitrary integer into the valid 1..=5 range, defaulting
    /// to 3 when out of range.
    #[must_use]
    pub fn clamp_or_default(value: i64) -> Self {
        if (1..=5).contains(&value) {
            ObservationPriority(value as u8)
        } else {
            ObservationPriority(3)
        }
    }
}

impl Default for ObservationPriority {
    fn default() -> Self {
        ObservationPriority(3)
    }
}

/// Closed set of reflection pattern tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTag {
    Workflow,
    Preference,
    Strategy,
    Error,
    Learning,
    General,
}

/// Provenance of a [`crate::skills::StoredSkill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSource {
    Execution,
    Manual,
    Evolution,
    Synthesis,
}
