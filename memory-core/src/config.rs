//! Aggregated configuration and defaults for every component.
//!
//! One struct per component, each `Default`-constructible, composed
//! into a top-level [`MemoryConfig`] that callers load from TOML (see
//! `memory-cli`).

use std::time::Duration;

/// Tier-promotion thresholds.
#[derive(Debug, Clone, Copy)]
pub struct PromotionThresholds {
    pub candidate_apply: u32,
    pub proven_apply: u32,
    pub proven_rate: f64,
    pub identity_apply: u32,
    pub identity_rate: f64,
    pub identity_sessions: usize,
    pub identity_age: chrono::Duration,
}

impl Default for PromotionThresholds {
    fn default() -> Self {
        Self {
            candidate_apply: 3,
            proven_apply: 10,
            proven_rate: 0.80,
            identity_apply: 25,
            identity_rate: 0.90,
            identity_sessions: 5,
            identity_age: chrono::Duration::days(30),
        }
    }
}

/// Minimum `apply_count` before a principle is considered for
/// `GetTopPrinciples`/ranking by success rate.
pub const MIN_EVIDENCE: u32 = 3;

/// DBSCAN clustering configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClusteringConfig {
    pub eps: f32,
    pub min_pts: usize,
    pub lookback_days: i64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 0.3,
            min_pts: 3,
            lookback_days: 30,
        }
    }
}

/// Skill-library thresholds.
#[derive(Debug, Clone, Copy)]
pub struct SkillConfig {
    /// Voyager rule: only traces at or above this confidence yield skills.
    pub min_learn_confidence: f32,
    /// Minimum cosine similarity for semantic skill retrieval.
    pub min_similarity: f32,
    /// Minimum Bayesian success rate for semantic/text skill retrieval.
    pub min_success_rate: f64,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            min_learn_confidence: 0.8,
            min_similarity: 0.7,
            min_success_rate: 0.6,
        }
    }
}

/// Observational pipeline thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ObservationalConfig {
    pub message_token_threshold: u32,
    pub observation_token_threshold: u32,
    pub min_observations_to_reflect: usize,
    pub observer_interval: Duration,
    pub reflector_interval: Duration,
    pub max_observations_per_reflection: usize,
}

impl Default for ObservationalConfig {
    fn default() -> Self {
        Self {
            message_token_threshold: 30_000,
            observation_token_threshold: 40_000,
            min_observations_to_reflect: 3,
            observer_interval: Duration::from_secs(10),
            reflector_interval: Duration::from_secs(30),
            max_observations_per_reflection: 50,
        }
    }
}

/// Passive retrieval configuration.
#[derive(Debug, Clone, Copy)]
pub struct PassiveRetrievalConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_results: usize,
    pub max_tokens_to_add: usize,
    pub min_trust: f32,
}

impl Default for PassiveRetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 50,
            max_results: 3,
            max_tokens_to_add: 300,
            min_trust: 0.5,
        }
    }
}

/// Next-scene prediction configuration.
#[derive(Debug, Clone, Copy)]
pub struct PredictionConfig {
    pub min_input_len: usize,
    pub predict_timeout_ms: u64,
    pub prefetch_timeout_ms: u64,
    pub prefetch_channel_capacity: usize,
    pub knowledge_limit: usize,
    pub skill_limit: usize,
    pub tool_limit: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            min_input_len: 10,
            predict_timeout_ms: 50,
            prefetch_timeout_ms: 100,
            prefetch_channel_capacity: 100,
            knowledge_limit: 5,
            skill_limit: 3,
            tool_limit: 2,
        }
    }
}

/// Resource limits for bounded-growth user memory.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub max_user_facts: usize,
    pub max_preferences: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_user_facts: 20,
            max_preferences: 15,
        }
    }
}

/// The embedder's bounded "fast" deadline used by `SearchSimilar`.
pub const EMBED_FAST_TIMEOUT: Duration = Duration::from_secs(5);

/// Top-level configuration aggregating every component's defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryConfig {
    pub promotion_thresholds: PromotionThresholds,
    pub clustering: ClusteringConfig,
    pub skills: SkillConfig,
    pub observational: ObservationalConfig,
    pub passive_retrieval: PassiveRetrievalConfig,
    pub prediction: PredictionConfig,
    pub resource_limits: ResourceLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let t = PromotionThresholds::default();
        assert_eq!(t.candidate_apply, 3);
        assert_eq!(t.proven_apply, 10);
        assert!((t.proven_rate - 0.80).abs() < f64::EPSILON);
        assert_eq!(t.identity_apply, 25);
        assert!((t.identity_rate - 0.90).abs() < f64::EPSILON);
        assert_eq!(t.identity_sessions, 5);

        let o = ObservationalConfig::default();
        assert_eq!(o.message_token_threshold, 30_000);
        assert_eq!(o.observation_token_threshold, 40_000);

        let p = PassiveRetrievalConfig::default();
        assert_eq!(p.timeout_ms, 50);
        assert_eq!(p.max_results, 3);
        assert_eq!(p.max_tokens_to_add, 300);

        let pred = PredictionConfig::default();
        assert_eq!(pred.min_input_len, 10);
        assert_eq!(pred.predict_timeout_ms, 50);
        assert_eq!(pred.prefetch_timeout_ms, 100);
    }
}
