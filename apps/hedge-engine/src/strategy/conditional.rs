//! Puts bought on a drawdown or volatility spike.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::orders::buy_notional_hedge;
use super::{
    HedgeStrategy, RehedgeOutcome, RehedgeResult, StrategyContext, StrategyError, check,
    check_expiries,
};
use crate::ledger::Portfolio;
use crate::market::TrailingWindow;

/// Conditional strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionalParams {
    /// Rows in the recent window.
    pub lookback_days: usize,
    /// Trigger when the recent return is at or below this.
    pub drawdown_trigger: f64,
    /// Trigger when recent volatility exceeds this multiple of long-run volatility.
    pub volatility_multiplier: f64,
    /// Rows in the long-run volatility window.
    pub long_window_days: usize,
    /// Rows of history required before any purchase.
    pub min_history_days: usize,
    /// Strike as a fraction of spot.
    pub strike_ratio: f64,
    /// Calendar days to expiry.
    pub expiry_days: u32,
}

impl Default for ConditionalParams {
    fn default() -> Self {
        Self {
            lookback_days: 20,
            drawdown_trigger: -0.05,
            volatility_multiplier: 1.5,
            long_window_days: 252,
            min_history_days: 50,
            strike_ratio: 0.85,
            expiry_days: 90,
        }
    }
}

impl ConditionalParams {
    pub(crate) fn validate(&self) -> Result<(), StrategyError> {
        check(self.lookback_days >= 2, "lookback_days must be at least 2")?;
        check(self.long_window_days >= 2, "long_window_days must be at least 2")?;
        check(
            self.volatility_multiplier > 0.0,
            "volatility_multiplier must be positive",
        )?;
        check(self.drawdown_trigger < 0.0, "drawdown_trigger must be negative")?;
        check(
            self.strike_ratio > 0.0 && self.strike_ratio.is_finite(),
            "strike_ratio must be positive",
        )?;
        check_expiries(&[self.expiry_days])
    }
}

/// Buys protection only when no put is active and the market is stressed.
#[derive(Debug, Clone)]
pub struct ConditionalStrategy {
    params: ConditionalParams,
}

impl ConditionalStrategy {
    /// Create the strategy.
    #[must_use]
    pub const fn new(params: ConditionalParams) -> Self {
        Self { params }
    }

    /// Whether the trailing history shows a drawdown or volatility spike.
    #[must_use]
    pub fn is_triggered(&self, history: &[crate::market::MarketSnapshot]) -> bool {
        let recent = TrailingWindow::new(history, self.params.lookback_days);
        let long = TrailingWindow::new(history, self.params.long_window_days);

        let drawdown = recent
            .cumulative_return()
            .is_some_and(|r| r <= self.params.drawdown_trigger);
        let spike = match (recent.daily_volatility(), long.daily_volatility()) {
            (Some(recent_vol), Some(long_vol)) => {
                recent_vol > self.params.volatility_multiplier * long_vol
            }
            _ => false,
        };
        drawdown || spike
    }
}

impl HedgeStrategy for ConditionalStrategy {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn rehedge_interval_days(&self) -> Option<u32> {
        None
    }

    fn rehedge(
        &self,
        portfolio: &mut Portfolio,
        context: &StrategyContext<'_>,
    ) -> Result<RehedgeResult, StrategyError> {
        if portfolio.active_contracts(context.date).next().is_some() {
            return Ok(RehedgeResult::new(
                RehedgeOutcome::skipped("protection already active"),
                0,
            ));
        }
        let required = self.params.lookback_days.max(self.params.min_history_days);
        if context.history.len() < required {
            return Ok(RehedgeResult::new(
                RehedgeOutcome::skipped("insufficient history"),
                0,
            ));
        }
        if !self.is_triggered(context.history) {
            debug!(date = %context.date, "Conditional trigger not met");
            return Ok(RehedgeResult::new(RehedgeOutcome::skipped("no trigger"), 0));
        }

        info!(date = %context.date, "Conditional hedge triggered");
        buy_notional_hedge(
            portfolio,
            context,
            self.params.strike_ratio,
            self.params.expiry_days,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{date, history, parametric, portfolio};
    use super::super::TradingParams;
    use super::*;
    use crate::optimizer::SolverSettings;

    fn flat_then_drop() -> Vec<f64> {
        let mut spots = vec![4500.0; 60];
        spots.extend((1..=10).map(|i| 4500.0 - 40.0 * f64::from(i)));
        spots
    }

    #[test]
    fn test_triggers_on_drawdown() {
        let strategy = ConditionalStrategy::new(ConditionalParams::default());
        let rows = history(&flat_then_drop(), 30.0);
        assert!(strategy.is_triggered(&rows));

        let calm = history(&[4500.0; 70], 15.0);
        assert!(!strategy.is_triggered(&calm));
    }

    #[test]
    fn test_buys_once_then_waits_for_expiry() {
        let strategy = ConditionalStrategy::new(ConditionalParams::default());
        let rows = history(&flat_then_drop(), 30.0);
        let today = rows.len() - 1;
        let premiums = parametric();
        let context = StrategyContext {
            date: date(today as i64),
            snapshot: rows[today],
            history: &rows,
            premiums: premiums.as_ref(),
            trading: TradingParams::default(),
            solver: SolverSettings::default(),
        };
        let mut p = portfolio(1_000_000);

        let Ok(first) = strategy.rehedge(&mut p, &context) else {
            panic!("rehedge failed");
        };
        assert!(matches!(first.outcome, RehedgeOutcome::Purchased { .. }));

        let Ok(second) = strategy.rehedge(&mut p, &context) else {
            panic!("rehedge failed");
        };
        assert_eq!(second.outcome, RehedgeOutcome::skipped("protection already active"));
    }

    #[test]
    fn test_short_history_skips() {
        let strategy = ConditionalStrategy::new(ConditionalParams::default());
        let rows = history(&[4500.0, 4000.0, 3500.0], 40.0);
        let premiums = parametric();
        let context = StrategyContext {
            date: date(2),
            snapshot: rows[2],
            history: &rows,
            premiums: premiums.as_ref(),
            trading: TradingParams::default(),
            solver: SolverSettings::default(),
        };
        let mut p = portfolio(1_000_000);
        let Ok(result) = strategy.rehedge(&mut p, &context) else {
            panic!("rehedge failed");
        };
        assert_eq!(result.outcome, RehedgeOutcome::skipped("insufficient history"));
    }
}
