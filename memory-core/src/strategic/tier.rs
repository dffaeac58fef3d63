//! Tier promotion lattice.

use super::StrategicMemory;
use crate::config::PromotionThresholds;
use crate::types::MemoryTier;
use chrono::Utc;

/// Computes the highest tier `mem` is eligible for, checking from the
/// top of the lattice down.
#[must_use]
pub fn calculate_eligible_tier(mem: &StrategicMemory, thresholds: &PromotionThresholds) -> MemoryTier {
    let age = Utc::now() - mem.created_at;
    let success_rate = mem.success_rate();
    let unique_sessions = mem
        .source_sessions
        .iter()
        .collect::<std::collections::HashSet<_>>()
        .len();

    if mem.apply_count >= thresholds.identity_apply
        && success_rate >= thresholds.identity_rate
        && unique_sessions >= thresholds.identity_sessions
        && age >= thresholds.identity_age
    {
        return MemoryTier::Identity;
    }
    if mem.apply_count >= thresholds.proven_apply && success_rate >= thresholds.proven_rate {
        return MemoryTier::Proven;
    }
    if mem.apply_count >= thresholds.candidate_apply {
        return MemoryTier::Candidate;
    }
    MemoryTier::Tentative
}

/// Result of a promotion attempt: whether a promotion happened, and the
/// (possibly unchanged) resulting tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionOutcome {
    pub promoted: bool,
    pub tier: MemoryTier,
}

/// Returns the new tier if `mem` is eligible to be promoted past its
/// current tier; never demotes.
#[must_use]
pub fn eligible_promotion(mem: &StrategicMemory, thresholds: &PromotionThresholds) -> PromotionOutcome {
    let eligible = calculate_eligible_tier(mem, thresholds);
    if eligible > mem.tier {
        PromotionOutcome {
            promoted: true,
            tier: eligible,
        }
    } else {
        PromotionOutcome {
            promoted: false,
            tier: mem.tier,
        }
    }
}

/// Builds the human-readable reason string for a [`super::PromotionNarrative`],
/// citing the triggering thresholds and observed metrics.
#[must_use]
pub fn promotion_reason(mem: &StrategicMemory, to_tier: MemoryTier, thresholds: &PromotionThresholds) -> String {
    match to_tier {
        MemoryTier::Candidate => format!(
            "Applied {} times (>= {} required for candidate)",
            mem.apply_count, thresholds.candidate_apply
        ),
        MemoryTier::Proven => format!(
            "Applied {} times with {:.0}% success rate (>= {} applications, >= {:.0}% required for proven)",
            mem.apply_count,
            mem.success_rate() * 100.0,
            thresholds.proven_apply,
            thresholds.proven_rate * 100.0
        ),
        MemoryTier::Identity => format!(
            "Applied {} times across {} sessions with {:.0}% success rate over {} days (>= {} applications, >= {} sessions, >= {:.0}% success, >= {} days required for identity)",
            mem.apply_count,
            mem.source_sessions.len(),
            mem.success_rate() * 100.0,
            (Utc::now() - mem.created_at).num_days(),
            thresholds.identity_apply,
            thresholds.identity_sessions,
            thresholds.identity_rate * 100.0,
            thresholds.identity_age.num_days(),
        ),
        MemoryTier::Tentative => "reverted to tentative".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn base_memory() -> StrategicMemory {
        StrategicMemory {
            id: format!("strat_{}", Uuid::new_v4()),
            principle: "always write tests first".into(),
            category: "testing".into(),
            trigger_pattern: "writing code".into(),
            tier: MemoryTier::Tentative,
            success_count: 0,
            failure_count: 0,
            apply_count: 0,
            confidence: 0.5,
            source_sessions: vec!["s1".into()],
            embedding: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_applied_at: None,
            version: 1,
            parent_id: None,
            evolution_chain: Vec::new(),
        }
    }

    #[test]
    fn promotion_chain_scenario_tier_candidate_after_five_successes() {
        let thresholds = PromotionThresholds::default();
        let mut mem = base_memory();
        mem.success_count = 5;
        mem.apply_count = 5;

        let outcome = eligible_promotion(&mem, &thresholds);
        assert!(outcome.promoted);
        assert_eq!(outcome.tier, MemoryTier::Candidate);

        let reason = promotion_reason(&mem, MemoryTier::Candidate, &thresholds);
        assert!(reason.contains("Applied 5 times"));

        mem.tier = outcome.tier;
        let second = eligible_promotion(&mem, &thresholds);
        assert!(!second.promoted);
        assert_eq!(second.tier, MemoryTier::Candidate);
    }

    #[test]
    fn never_demotes() {
        let thresholds = PromotionThresholds::default();
        let mut mem = base_memory();
        mem.tier = MemoryTier::Proven;
        mem.apply_count = 1; // would only be eligible for tentative on raw metrics
        let outcome = eligible_promotion(&mem, &thresholds);
        assert!(!outcome.promoted);
        assert_eq!(outcome.tier, MemoryTier::Proven);
    }

    #[test]
    fn identity_requires_age_sessions_rate_and_applies() {
        let thresholds = PromotionThresholds::default();
        let mut mem = base_memory();
        mem.apply_count = 25;
        mem.success_count = 23;
        mem.source_sessions = (0..5).map(|i| format!("s{i}")).collect();
        mem.created_at = Utc::now() - Duration::days(31);
        let eligible = calculate_eligible_tier(&mem, &thresholds);
        assert_eq!(eligible, MemoryTier::Identity);

        mem.created_at = Utc::now();
        let too_young = calculate_eligible_tier(&mem, &thresholds);
        assert_eq!(too_young, MemoryTier::Proven);
    }
}
