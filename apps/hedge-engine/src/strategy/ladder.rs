//! Budget-ladder LP strategy.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::orders::{Rounding, execute_orders, orders_from_selection};
use super::{
    HedgeStrategy, RehedgeOutcome, RehedgeResult, StrategyContext, StrategyError, check,
    check_expiries,
};
use crate::ledger::Portfolio;
use crate::optimizer::{
    BudgetLadder, LadderInputs, LadderRung, OptimizerError, UniverseSpec, build_universe,
    default_rungs,
};

/// Budget-ladder strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetLadderParams {
    /// Calendar days between rehedges.
    pub rehedge_interval_days: u32,
    /// Expiries offered to the optimizer, in calendar days.
    pub expiry_days: Vec<u32>,
    /// Strike grid as fractions of spot; empty uses the 5%..60% OTM grid.
    pub strike_ratios: Vec<f64>,
    /// Prefer strikes recorded in the quote store over the grid.
    pub recorded_strikes: bool,
    /// Budget as a fraction of portfolio value at the reference volatility.
    pub base_rate: f64,
    /// Volatility proxy at which the budget equals `base_rate`.
    pub reference_volatility: f64,
    /// Moneyness rungs.
    pub rungs: Vec<LadderRung>,
}

impl Default for BudgetLadderParams {
    fn default() -> Self {
        Self {
            rehedge_interval_days: 90,
            expiry_days: vec![90],
            strike_ratios: Vec::new(),
            recorded_strikes: true,
            base_rate: 0.01,
            reference_volatility: 20.0,
            rungs: default_rungs(),
        }
    }
}

impl BudgetLadderParams {
    pub(crate) fn validate(&self) -> Result<(), StrategyError> {
        check(self.rehedge_interval_days > 0, "rehedge_interval_days must be positive")?;
        check_expiries(&self.expiry_days)?;
        check(
            self.strike_ratios.iter().all(|r| *r > 0.0 && r.is_finite()),
            "strike_ratios must be positive",
        )?;
        check(self.base_rate >= 0.0, "base_rate must not be negative")?;
        check(self.reference_volatility > 0.0, "reference_volatility must be positive")?;
        check(!self.rungs.is_empty(), "at least one rung is required")?;
        check(
            self.rungs
                .iter()
                .all(|r| (0.0..=1.0).contains(&r.budget_fraction) && r.min_otm < r.max_otm),
            "rungs need min_otm < max_otm and a fraction in [0, 1]",
        )
    }

    fn universe(&self, transaction_cost_rate: f64) -> UniverseSpec {
        if self.strike_ratios.is_empty() {
            UniverseSpec {
                expiry_days: self.expiry_days.clone(),
                recorded_strikes: self.recorded_strikes,
                ..UniverseSpec::otm_grid(0, transaction_cost_rate)
            }
        } else {
            UniverseSpec {
                strike_ratios: self.strike_ratios.clone(),
                expiry_days: self.expiry_days.clone(),
                transaction_cost_rate,
                recorded_strikes: self.recorded_strikes,
            }
        }
    }
}

/// Spends an adaptive budget across moneyness rungs.
#[derive(Debug, Clone)]
pub struct BudgetLadderStrategy {
    params: BudgetLadderParams,
    ladder: BudgetLadder,
}

impl BudgetLadderStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(params: BudgetLadderParams) -> Self {
        let ladder = BudgetLadder {
            base_rate: params.base_rate,
            reference_volatility: params.reference_volatility,
            rungs: params.rungs.clone(),
        };
        Self { params, ladder }
    }
}

impl HedgeStrategy for BudgetLadderStrategy {
    fn name(&self) -> &'static str {
        "budget_ladder_lp"
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
            &self.params.universe(context.trading.option_transaction_cost),
        );
        let inputs = LadderInputs {
            portfolio_value: context.portfolio_value(portfolio),
            spot,
            beta: portfolio.beta(),
            volatility_proxy: context.snapshot.volatility_proxy,
        };

        let solution = match self.ladder.solve(&universe.candidates, &inputs, &context.solver) {
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
            info!(date = %context.date, budget = ?solution.budget, "Budget ladder chose zero hedge");
            return Ok(RehedgeResult::new(
                RehedgeOutcome::NoProtectionNeeded,
                universe.fallback_quotes,
            ));
        }

        let orders = orders_from_selection(
            &solution.selections(&universe.candidates),
            context,
            Rounding::Down,
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

    fn context<'a>(
        rows: &'a [crate::market::MarketSnapshot],
        premiums: &'a dyn crate::pricing::PremiumProvider,
    ) -> StrategyContext<'a> {
        StrategyContext {
            date: date(0),
            snapshot: rows[0],
            history: rows,
            premiums,
            trading: TradingParams::default(),
            solver: SolverSettings::default(),
        }
    }

    #[test]
    fn test_buys_within_budget() {
        let rows = history(&[4500.0], 40.0);
        let premiums = parametric();
        let mut p = portfolio(10_000_000);
        let strategy = BudgetLadderStrategy::new(BudgetLadderParams::default());

        let result = match strategy.rehedge(&mut p, &context(&rows, premiums.as_ref())) {
            Ok(r) => r,
            Err(e) => panic!("rehedge failed: {e}"),
        };
        let RehedgeOutcome::Purchased { premium_paid, .. } = result.outcome else {
            panic!("expected purchase, got {:?}", result.outcome);
        };
        // Budget = 10M × 1% × 2 = 200,000; floored quantities stay inside it.
        assert!(premium_paid <= rust_decimal_macros::dec!(200_000));
    }

    #[test]
    fn test_mandatory_empty_rung_is_no_hedge_available() {
        let mut params = BudgetLadderParams {
            strike_ratios: vec![0.90],
            ..BudgetLadderParams::default()
        };
        params.rungs[3].required = true;
        let rows = history(&[4500.0], 20.0);
        let premiums = parametric();
        let mut p = portfolio(1_000_000);

        let Ok(result) = BudgetLadderStrategy::new(params).rehedge(&mut p, &context(&rows, premiums.as_ref()))
        else {
            panic!("infeasible is not an error");
        };
        assert!(matches!(result.outcome, RehedgeOutcome::NoHedgeAvailable { .. }));
        assert!(p.contracts().is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_expiries() {
        let params = BudgetLadderParams {
            expiry_days: Vec::new(),
            ..BudgetLadderParams::default()
        };
        assert!(params.validate().is_err());
    }
}
