//! Strategic principle store: Bayesian-smoothed success
//! tracking, a four-tier promotion lattice, evolution lineage, and
//! outcome attribution.

mod repository;
mod store;
pub mod tier;

pub use repository::{InMemoryStrategicRepository, StrategicRepository};
pub use store::StrategicStore;

use crate::types::{MemoryTier, Outcome, RetrievalType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mutable record representing one learned heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicMemory {
    pub id: String,
    pub principle: String,
    pub category: String,
    pub trigger_pattern: String,
    pub tier: MemoryTier,
    pub success_count: u32,
    pub failure_count: u32,
    pub apply_count: u32,
    pub confidence: f32,
    pub source_sessions: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_applied_at: Option<DateTime<Utc>>,
    pub version: u32,
    pub parent_id: Option<String>,
    /// Ordered ancestry, oldest first, excluding `self.id` (spec invariant).
    pub evolution_chain: Vec<String>,
}

impl StrategicMemory {
    /// `success_count / apply_count`, or `0.5` (prior) when
    /// `apply_count == 0`.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.apply_count == 0 {
            0.5
        } else {
            f64::from(self.success_count) / f64::from(self.apply_count)
        }
    }
}

/// Append-only audit record of a tier change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionNarrative {
    pub memory_id: String,
    pub from_tier: MemoryTier,
    pub to_tier: MemoryTier,
    pub reason: String,
    pub metric_snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Links one retrieval to one memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeAttribution {
    pub memory_id: String,
    pub query_id: String,
    pub query_text: String,
    pub outcome: Outcome,
    pub contribution: f32,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Per-query retrieval trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationLog {
    pub query_id: String,
    pub query_text: String,
    pub returned_memory_ids: Vec<String>,
    pub retrieval_type: RetrievalType,
    pub latency_ms: u64,
    pub tokens_used: u32,
    pub lane: crate::types::Lane,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot returned by `CalculateMemoryImpact`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryImpact {
    pub total_uses: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: f64,
}

/// Truncates `text` to at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
