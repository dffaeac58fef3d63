//! Bayesian success-rate estimator for skills.
//!
//! Deliberately distinct from [`crate::strategic::StrategicMemory::success_rate`]'s
//! frequentist `success / apply` (with a 0.5-prior fallback at zero
//! evidence): skills use a Beta(1,1) posterior mean instead, and the two
//! formulas are never unified.

/// Beta(1,1) posterior mean: `(success + 1) / (success + failure + 2)`.
#[must_use]
pub fn bayesian_success_rate(success_count: u32, failure_count: u32) -> f64 {
    f64::from(success_count + 1) / f64::from(success_count + failure_count + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_evidence_yields_half() {
        assert!((bayesian_success_rate(0, 0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn all_successes_approaches_but_never_reaches_one() {
        let rate = bayesian_success_rate(100, 0);
        assert!(rate < 1.0);
        assert!(rate > 0.99);
    }

    #[test]
    fn matches_spec_example() {
        // 3 successes, 1 failure -> (3+1)/(3+1+2) = 4/6
        assert!((bayesian_success_rate(3, 1) - (4.0 / 6.0)).abs() < f64::EPSILON);
    }
}
