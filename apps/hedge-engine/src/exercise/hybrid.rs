//! Logical OR of the volatility-regime and optimal-boundary rules.

use super::ExerciseRule;
use super::boundary::OptimalBoundaryRule;
use super::context::ExerciseContext;
use super::regime::VolatilityRegimeRule;

/// Fires when either component rule fires. Default policy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HybridRule {
    regime: VolatilityRegimeRule,
    boundary: OptimalBoundaryRule,
}

impl HybridRule {
    /// Combine the two component rules.
    #[must_use]
    pub const fn new(regime: VolatilityRegimeRule, boundary: OptimalBoundaryRule) -> Self {
        Self { regime, boundary }
    }
}

impl ExerciseRule for HybridRule {
    fn should_exercise(&self, context: &ExerciseContext) -> bool {
        self.regime.should_exercise(context) || self.boundary.should_exercise(context)
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}
