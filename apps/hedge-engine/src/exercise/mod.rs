//! Early-exercise decision rules for held puts.
//!
//! Every rule implements [`ExerciseRule`], a pure function of an
//! [`ExerciseContext`]: no state, no side effects, identical output for
//! identical input. The simulation engine builds one context per held
//! contract per date and settles the contracts whose rule fires.
//!
//! | Rule | Fires when |
//! |------|------------|
//! | [`NeverExercise`] | never (European behaviour, settle at expiry) |
//! | [`ThresholdRule`] | time value < threshold × intrinsic |
//! | [`VolatilityRegimeRule`] | S/K < 0.90 and the proxy fell ≥ 15% |
//! | [`OptimalBoundaryRule`] | S/K below the critical ratio and < 30 days left |
//! | [`HybridRule`] | volatility regime OR optimal boundary |
//!
//! # Known Limitation
//!
//! The threshold rule needs a time-value estimate. Under an intrinsic-only
//! pricer the context carries `time_value = 0`, and the rule exercises every
//! in-the-money contract on the first date it is evaluated.

mod boundary;
mod context;
mod hybrid;
mod regime;
mod threshold;

pub use boundary::OptimalBoundaryRule;
pub use context::ExerciseContext;
pub use hybrid::HybridRule;
pub use regime::VolatilityRegimeRule;
pub use threshold::ThresholdRule;

use crate::config::{ExerciseConfig, ExercisePolicy};

/// A stateless early-exercise decision.
pub trait ExerciseRule: Send + Sync + std::fmt::Debug {
    /// Whether to exercise now.
    fn should_exercise(&self, context: &ExerciseContext) -> bool;

    /// Rule name for logging.
    fn name(&self) -> &'static str;
}

/// Never exercise early.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverExercise;

impl ExerciseRule for NeverExercise {
    fn should_exercise(&self, _context: &ExerciseContext) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "never"
    }
}

/// Build the configured rule.
#[must_use]
pub fn build_rule(config: &ExerciseConfig) -> Box<dyn ExerciseRule> {
    let regime = VolatilityRegimeRule::new(config.moneyness_trigger, config.volatility_drop);
    let boundary = OptimalBoundaryRule::new(config.max_days_to_expiry);

    match config.policy {
        ExercisePolicy::Never => Box::new(NeverExercise),
        ExercisePolicy::Threshold => Box::new(ThresholdRule::new(config.threshold)),
        ExercisePolicy::VolatilityRegime => Box::new(regime),
        ExercisePolicy::OptimalBoundary => Box::new(boundary),
        ExercisePolicy::Hybrid => Box::new(HybridRule::new(regime, boundary)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deep_itm_recovering() -> ExerciseContext {
        ExerciseContext {
            spot: 2600.0,
            strike: 3200.0,
            days_to_expiry: 45,
            volatility_proxy: 55.0,
            volatility_proxy_previous: Some(80.0),
            risk_free_rate: 0.045,
            time_value: 120.0,
        }
    }

    #[test]
    fn test_build_rule_names() {
        let mut config = ExerciseConfig::default();
        assert_eq!(build_rule(&config).name(), "hybrid");

        config.policy = ExercisePolicy::Never;
        assert_eq!(build_rule(&config).name(), "never");
        config.policy = ExercisePolicy::Threshold;
        assert_eq!(build_rule(&config).name(), "threshold");
        config.policy = ExercisePolicy::VolatilityRegime;
        assert_eq!(build_rule(&config).name(), "volatility_regime");
        config.policy = ExercisePolicy::OptimalBoundary;
        assert_eq!(build_rule(&config).name(), "optimal_boundary");
    }

    #[test]
    fn test_never_rule() {
        assert!(!NeverExercise.should_exercise(&deep_itm_recovering()));
    }

    #[test]
    fn test_default_rule_fires_on_recovery_signal() {
        let rule = build_rule(&ExerciseConfig::default());
        assert!(rule.should_exercise(&deep_itm_recovering()));
    }
}
