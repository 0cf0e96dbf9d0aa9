//! Scenario-floor LP strategy.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::orders::{Rounding, execute_orders, orders_from_selection};
use super::{
    HedgeStrategy, RehedgeOutcome, RehedgeResult, StrategyContext, StrategyError, check,
    check_expiries,
};
use crate::ledger::Portfolio;
use crate::market::TrailingWindow;
use crate::optimizer::{
    FloorInputs, OptimizerError, Scenario, ScenarioCalibration, ScenarioFloor, UniverseSpec,
    build_universe, default_scenarios,
};

/// Scenario-floor strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioFloorParams {
    /// Calendar days between rehedges.
    pub rehedge_interval_days: u32,
    /// Expiries offered to the optimizer, in calendar days.
    pub expiry_days: Vec<u32>,
    /// Strike grid as fractions of spot.
    pub strike_ratios: Vec<f64>,
    /// Prefer strikes recorded in the quote store over the grid.
    pub recorded_strikes: bool,
    /// Maximum tolerated loss as a fraction of portfolio value.
    pub max_loss: f64,
    /// Return scenarios the floor must hold under.
    pub scenarios: Vec<Scenario>,
    /// How adverse scenarios are adjusted before each solve.
    pub calibration: ScenarioCalibration,
}

impl Default for ScenarioFloorParams {
    fn default() -> Self {
        Self {
            rehedge_interval_days: 90,
            expiry_days: vec![90],
            strike_ratios: vec![0.50, 0.70, 0.90, 1.00],
            recorded_strikes: true,
            max_loss: 0.20,
            scenarios: default_scenarios(),
            calibration: ScenarioCalibration::Fixed,
        }
    }
}

impl ScenarioFloorParams {
    pub(crate) fn validate(&self) -> Result<(), StrategyError> {
        check(self.rehedge_interval_days > 0, "rehedge_interval_days must be positive")?;
        check_expiries(&self.expiry_days)?;
        check(!self.strike_ratios.is_empty(), "strike_ratios must not be empty")?;
        check(
            self.strike_ratios.iter().all(|r| *r > 0.0 && r.is_finite()),
            "strike_ratios must be positive",
        )?;
        check((0.0..1.0).contains(&self.max_loss), "max_loss must be in [0, 1)")?;
        check(!self.scenarios.is_empty(), "at least one scenario is required")?;
        check(
            self.scenarios.iter().all(|s| s.index_return > -1.0),
            "scenario returns must exceed -100%",
        )?;
        if let ScenarioCalibration::VolatilityScaled {
            z, lookback_days, ..
        } = self.calibration
        {
            check(z >= 0.0, "calibration z must not be negative")?;
            check(lookback_days >= 2, "calibration lookback_days must be at least 2")?;
        }
        Ok(())
    }
}

/// Buys the cheapest put mix keeping every scenario above the floor.
#[derive(Debug, Clone)]
pub struct ScenarioFloorStrategy {
    params: ScenarioFloorParams,
    floor: ScenarioFloor,
}

impl ScenarioFloorStrategy {
    /// Create the strategy.
    #[must_use]
    pub const fn new(params: ScenarioFloorParams) -> Self {
        let floor = ScenarioFloor::new(params.max_loss);
        Self { params, floor }
    }

    /// Scenarios after calibration against `history`.
    #[must_use]
    pub fn calibrated_scenarios(&self, history: &[crate::market::MarketSnapshot]) -> Vec<Scenario> {
        let realized = self
            .params
            .calibration
            .lookback_days()
            .and_then(|days| TrailingWindow::new(history, days).annualized_volatility());
        self.params.calibration.calibrate(&self.params.scenarios, realized)
    }
}

impl HedgeStrategy for ScenarioFloorStrategy {
    fn name(&self) -> &'static str {
        "scenario_floor_lp"
    }

    fn rehedge_interval_days(&self) -> Option<u32> {
        Some(self.params.rehedge_interval_days)
    }

    fn rehedge(
        &self,
        portfolio: &mut Portfolio,
        context: &StrategyContext<'_>,
    ) -> Result<RehedgeResult, StrategyError> {
        let spot = context.spot();
        let universe = build_universe(
            context.premiums,
            spot,
            context.date,
            context.snapshot.volatility_proxy,
            &UniverseSpec {
                strike_ratios: self.params.strike_ratios.clone(),
                expiry_days: self.params.expiry_days.clone(),
                transaction_cost_rate: context.trading.option_transaction_cost,
                recorded_strikes: self.params.recorded_strikes,
            },
        );
        let scenarios = self.calibrated_scenarios(context.history);
        let inputs = FloorInputs {
            portfolio_value: context.portfolio_value(portfolio),
            spot,
            beta: portfolio.beta(),
        };

        let solution =
            match self.floor.solve(&universe.candidates, &inputs, &scenarios, &context.solver) {
                Ok(solution) => solution,
                Err(OptimizerError::Infeasible { reason, formulation }) => {
                    warn!(date = %context.date, %formulation, %reason, "No hedge available");
                    return Ok(RehedgeResult::new(
                        RehedgeOutcome::NoHedgeAvailable { reason },
                        universe.fallback_quotes,
                    ));
                }
                Err(e) => return Err(e.into()),
            };

        if solution.is_zero_hedge() {
            let worst = scenarios
                .iter()
                .map(|s| s.index_return)
                .fold(f64::INFINITY, f64::min);
            info!(
                date = %context.date,
                worst_scenario_return = worst,
                max_loss = self.params.max_loss,
                "Scenario floor already met unhedged; zero hedge"
            );
            return Ok(RehedgeResult::new(
                RehedgeOutcome::NoProtectionNeeded,
                universe.fallback_quotes,
            ));
        }

        let orders = orders_from_selection(
            &solution.selections(&universe.candidates),
            context,
            Rounding::Up,
        )?;
        let outcome = execute_orders(portfolio, &orders, context.trading.contract_multiplier)?;
        Ok(RehedgeResult::new(outcome, universe.fallback_quotes))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{date, history, parametric, portfolio};
    use super::super::TradingParams;
    use super::*;
    use crate::optimizer::SolverSettings;

    fn run(params: ScenarioFloorParams, spots: &[f64]) -> (RehedgeResult, Portfolio) {
        let rows = history(spots, 20.0);
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
        let result = match ScenarioFloorStrategy::new(params).rehedge(&mut p, &context) {
            Ok(r) => r,
            Err(e) => panic!("rehedge failed: {e}"),
        };
        (result, p)
    }

    #[test]
    fn test_default_crash_scenario_buys_protection() {
        let (result, p) = run(ScenarioFloorParams::default(), &[4500.0]);
        assert!(matches!(result.outcome, RehedgeOutcome::Purchased { .. }));
        assert!(!p.contracts().is_empty());
    }

    #[test]
    fn test_mild_scenarios_give_zero_hedge() {
        let params = ScenarioFloorParams {
            scenarios: vec![Scenario::new("mild", -0.10), Scenario::new("up", 0.10)],
            ..ScenarioFloorParams::default()
        };
        let (result, p) = run(params, &[4500.0]);
        assert_eq!(result.outcome, RehedgeOutcome::NoProtectionNeeded);
        assert!(p.contracts().is_empty());
    }

    #[test]
    fn test_calm_history_calibrates_crash_away() {
        // Alternating ±0.5% days: annualized vol ≈ 8%.
        let spots: Vec<f64> = (0..260)
            .map(|i| if i % 2 == 0 { 4500.0 } else { 4522.5 })
            .collect();
        let params = ScenarioFloorParams {
            scenarios: vec![
                Scenario::new("crash", -0.48),
                Scenario::new("mild", -0.10),
                Scenario::new("up", 0.10),
            ],
            calibration: ScenarioCalibration::VolatilityScaled {
                z: 2.33,
                horizon_days: 90,
                lookback_days: 252,
            },
            ..ScenarioFloorParams::default()
        };
        let (result, _) = run(params, &spots);
        assert_eq!(result.outcome, RehedgeOutcome::NoProtectionNeeded);
    }

    #[test]
    fn test_validate_rejects_bad_max_loss() {
        let params = ScenarioFloorParams {
            max_loss: 1.0,
            ..ScenarioFloorParams::default()
        };
        assert!(params.validate().is_err());
    }
}
