//! Approximate American-put early-exercise boundary.

use super::ExerciseRule;
use super::context::ExerciseContext;

/// Fires when fewer than `max_days_to_expiry` days remain and `spot/strike`
/// is below `(0.85 − 0.10·r) + 0.15·√T·σ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimalBoundaryRule {
    max_days_to_expiry: i64,
}

impl OptimalBoundaryRule {
    /// Create a rule.
    #[must_use]
    pub const fn new(max_days_to_expiry: i64) -> Self {
        Self { max_days_to_expiry }
    }

    /// Critical `spot/strike` ratio below which exercise is optimal.
    #[must_use]
    pub fn critical_moneyness(context: &ExerciseContext) -> f64 {
        let base = 0.85 - 0.10 * context.risk_free_rate;
        base + 0.15 * context.years_to_expiry().sqrt() * context.volatility()
    }
}

impl Default for OptimalBoundaryRule {
    fn default() -> Self {
        Self::new(30)
    }
}

impl ExerciseRule for OptimalBoundaryRule {
    fn should_exercise(&self, context: &ExerciseContext) -> bool {
        if !context.is_in_the_money() || context.days_to_expiry >= self.max_days_to_expiry {
            return false;
        }
        context.moneyness() < Self::critical_moneyness(context)
    }

    fn name(&self) -> &'static str {
        "optimal_boundary"
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn context(spot: f64, days: i64, vix: f64) -> ExerciseContext {
        ExerciseContext {
            spot,
            strike: 4000.0,
            days_to_expiry: days,
            volatility_proxy: vix,
            volatility_proxy_previous: Some(vix),
            risk_free_rate: 0.045,
            time_value: 0.0,
        }
    }

    #[test]
    fn test_critical_moneyness() {
        let critical = OptimalBoundaryRule::critical_moneyness(&context(3200.0, 73, 40.0));
        let expected = 0.85 - 0.0045 + 0.15 * 0.2_f64.sqrt() * 0.40;
        assert!((critical - expected).abs() < 1e-12);
    }

    #[test_case(3200.0, 20, 40.0, true ; "deep itm near expiry")]
    #[test_case(3200.0, 30, 40.0, false ; "thirty days is too early")]
    #[test_case(3200.0, 45, 40.0, false ; "far from expiry")]
    #[test_case(3700.0, 20, 40.0, false ; "above boundary")]
    #[test_case(4100.0, 5, 40.0, false ; "out of the money")]
    fn test_optimal_boundary_rule(spot: f64, days: i64, vix: f64, expected: bool) {
        assert_eq!(OptimalBoundaryRule::default().should_exercise(&context(spot, days, vix)), expected);
    }
}
