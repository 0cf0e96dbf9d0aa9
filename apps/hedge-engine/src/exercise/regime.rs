//! Exercise deep in-the-money puts when volatility collapses after a panic.

use super::ExerciseRule;
use super::context::ExerciseContext;

/// Fires when `spot/strike < moneyness_trigger` and the volatility proxy has
/// fallen by at least `volatility_drop` since its prior reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityRegimeRule {
    moneyness_trigger: f64,
    volatility_drop: f64,
}

impl VolatilityRegimeRule {
    /// Create a rule.
    #[must_use]
    pub const fn new(moneyness_trigger: f64, volatility_drop: f64) -> Self {
        Self {
            moneyness_trigger,
            volatility_drop,
        }
    }
}

impl Default for VolatilityRegimeRule {
    fn default() -> Self {
        Self::new(0.90, 0.15)
    }
}

impl ExerciseRule for VolatilityRegimeRule {
    fn should_exercise(&self, context: &ExerciseContext) -> bool {
        if !context.is_in_the_money() {
            return false;
        }
        let Some(change) = context.volatility_proxy_change() else {
            return false;
        };
        context.moneyness() < self.moneyness_trigger && change <= -self.volatility_drop
    }

    fn name(&self) -> &'static str {
        "volatility_regime"
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn context(spot: f64, vix: f64, previous: Option<f64>) -> ExerciseContext {
        ExerciseContext {
            spot,
            strike: 3000.0,
            days_to_expiry: 60,
            volatility_proxy: vix,
            volatility_proxy_previous: previous,
            risk_free_rate: 0.045,
            time_value: 0.0,
        }
    }

    #[test_case(2500.0, 60.0, Some(82.0), true ; "deep itm and proxy down 27 percent")]
    #[test_case(2500.0, 68.0, Some(80.0), true ; "proxy down exactly 15 percent")]
    #[test_case(2500.0, 75.0, Some(82.0), false ; "proxy decline too small")]
    #[test_case(2850.0, 60.0, Some(82.0), false ; "not deep enough")]
    #[test_case(3100.0, 20.0, Some(40.0), false ; "out of the money")]
    #[test_case(2500.0, 60.0, None, false ; "no prior reading")]
    #[test_case(2500.0, 60.0, Some(0.0), false ; "invalid prior reading")]
    fn test_volatility_regime_rule(spot: f64, vix: f64, previous: Option<f64>, expected: bool) {
        let rule = VolatilityRegimeRule::default();
        assert_eq!(rule.should_exercise(&context(spot, vix, previous)), expected);
    }
}
