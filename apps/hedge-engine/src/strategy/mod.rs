//! Hedging strategies invoked by the simulation engine.
//!
//! A strategy is a [`HedgeStrategy`] value chosen when the simulation is
//! configured. On each rehedge date the engine hands it the portfolio and a
//! read-only [`StrategyContext`]; the strategy may buy puts through the
//! ledger and reports what happened as a [`RehedgeOutcome`].
//!
//! Recoverable results (zero hedge, infeasible LP, refused purchase) are
//! outcome values. Only malformed inputs and ledger validation failures are
//! errors.

mod conditional;
mod floor;
mod ladder;
mod orders;
mod quarterly;

pub use conditional::{ConditionalParams, ConditionalStrategy};
pub use floor::{ScenarioFloorParams, ScenarioFloorStrategy};
pub use ladder::{BudgetLadderParams, BudgetLadderStrategy};
pub use quarterly::{QuarterlyParams, QuarterlyStrategy};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StrategyKind;
use crate::ledger::{ContractId, LedgerError, Portfolio};
use crate::market::MarketSnapshot;
use crate::optimizer::{InfeasibleReason, OptimizerError, SolverSettings};
use crate::pricing::PremiumProvider;

/// Strategy errors that abort a run.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Optimizer rejected its inputs or the solver crashed.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Ledger rejected a purchase for a reason other than cash.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Parameters are out of range.
    #[error("Invalid strategy parameters: {0}")]
    InvalidParameters(String),
}

/// What a rehedge did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RehedgeOutcome {
    /// Puts were bought.
    Purchased {
        /// New contract identifiers.
        contracts: Vec<ContractId>,
        /// Index units bought across all contracts.
        units: u64,
        /// Premium debited, including transaction costs.
        premium_paid: Decimal,
        /// Whether quantities were cut to fit available funding.
        sized_down: bool,
    },
    /// The strategy decided no protection is required (zero hedge).
    NoProtectionNeeded,
    /// The optimizer found no feasible hedge this period.
    NoHedgeAvailable {
        /// Cause reported by the optimizer.
        reason: InfeasibleReason,
    },
    /// Funding could not cover even the smallest purchase.
    InsufficientCash {
        /// Premium required.
        required: Decimal,
        /// Funding available.
        available: Decimal,
    },
    /// Nothing attempted.
    Skipped {
        /// Why.
        reason: String,
    },
}

impl RehedgeOutcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Purchased { .. } => "purchased",
            Self::NoProtectionNeeded => "no_protection_needed",
            Self::NoHedgeAvailable { .. } => "no_hedge_available",
            Self::InsufficientCash { .. } => "insufficient_cash",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Outcome plus pricing diagnostics for one rehedge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RehedgeResult {
    /// What happened.
    pub outcome: RehedgeOutcome,
    /// Premiums priced by the fallback estimator.
    pub fallback_quotes: usize,
}

impl RehedgeResult {
    pub(crate) const fn new(outcome: RehedgeOutcome, fallback_quotes: usize) -> Self {
        Self {
            outcome,
            fallback_quotes,
        }
    }
}

/// Trading parameters shared by all strategies in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingParams {
    /// Index units per contract.
    pub contract_multiplier: u32,
    /// Option transaction cost as a fraction of premium.
    pub option_transaction_cost: f64,
}

impl Default for TradingParams {
    fn default() -> Self {
        Self {
            contract_multiplier: 100,
            option_transaction_cost: 0.05,
        }
    }
}

/// Read-only market state for one rehedge.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    /// Simulated date.
    pub date: NaiveDate,
    /// Market state on `date`.
    pub snapshot: MarketSnapshot,
    /// Market rows up to and including `date`.
    pub history: &'a [MarketSnapshot],
    /// Premium source.
    pub premiums: &'a dyn PremiumProvider,
    /// Contract sizing and costs.
    pub trading: TradingParams,
    /// LP solver settings.
    pub solver: SolverSettings,
}

impl std::fmt::Debug for StrategyContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyContext")
            .field("date", &self.date)
            .field("snapshot", &self.snapshot)
            .field("history_len", &self.history.len())
            .field("premiums", &self.premiums.name())
            .field("trading", &self.trading)
            .finish_non_exhaustive()
    }
}

impl StrategyContext<'_> {
    /// Spot as f64.
    #[must_use]
    pub fn spot(&self) -> f64 {
        self.snapshot.spot.to_f64().unwrap_or(0.0)
    }

    /// Portfolio value marked at today's spot, as f64.
    #[must_use]
    pub fn portfolio_value(&self, portfolio: &Portfolio) -> f64 {
        portfolio
            .total_value(self.snapshot.spot, self.date)
            .to_f64()
            .unwrap_or(0.0)
    }
}

/// A pluggable hedging strategy.
pub trait HedgeStrategy: Send + Sync + std::fmt::Debug {
    /// Variant name for logging.
    fn name(&self) -> &'static str;

    /// Calendar days between rehedges; `None` evaluates every date.
    fn rehedge_interval_days(&self) -> Option<u32>;

    /// Rehedge the portfolio.
    fn rehedge(
        &self,
        portfolio: &mut Portfolio,
        context: &StrategyContext<'_>,
    ) -> Result<RehedgeResult, StrategyError>;
}

/// Build the strategy for a configured variant.
#[must_use]
pub fn build_strategy(kind: &StrategyKind) -> Box<dyn HedgeStrategy> {
    match kind {
        StrategyKind::Quarterly(params) => Box::new(QuarterlyStrategy::new(params.clone())),
        StrategyKind::Conditional(params) => Box::new(ConditionalStrategy::new(params.clone())),
        StrategyKind::BudgetLadderLp(params) => Box::new(BudgetLadderStrategy::new(params.clone())),
        StrategyKind::ScenarioFloorLp(params) => Box::new(ScenarioFloorStrategy::new(params.clone())),
    }
}

/// Check a configured variant's parameters.
pub fn validate_params(kind: &StrategyKind) -> Result<(), StrategyError> {
    match kind {
        StrategyKind::Quarterly(params) => params.validate(),
        StrategyKind::Conditional(params) => params.validate(),
        StrategyKind::BudgetLadderLp(params) => params.validate(),
        StrategyKind::ScenarioFloorLp(params) => params.validate(),
    }
}

pub(crate) fn check(condition: bool, message: &str) -> Result<(), StrategyError> {
    if condition {
        Ok(())
    } else {
        Err(StrategyError::InvalidParameters(message.to_string()))
    }
}

pub(crate) fn check_expiries(expiry_days: &[u32]) -> Result<(), StrategyError> {
    check(!expiry_days.is_empty(), "expiry_days must not be empty")?;
    check(expiry_days.iter().all(|d| *d > 0), "expiry_days must be positive")
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    use crate::ledger::{Portfolio, PortfolioSettings};
    use crate::market::MarketSnapshot;
    use crate::pricing::{FallbackPremiumProvider, ParametricPremiumEstimator, PremiumProvider};

    pub(crate) fn date(offset: i64) -> NaiveDate {
        let Some(start) = NaiveDate::from_ymd_opt(2020, 1, 1) else {
            panic!("valid date");
        };
        start + chrono::Duration::days(offset)
    }

    /// Daily rows with the given spots and a flat proxy.
    pub(crate) fn history(spots: &[f64], vix: f64) -> Vec<MarketSnapshot> {
        spots
            .iter()
            .enumerate()
            .map(|(i, s)| {
                MarketSnapshot::new(
                    date(i as i64),
                    Decimal::from_f64(*s).unwrap_or(Decimal::ONE),
                    vix,
                )
            })
            .collect()
    }

    pub(crate) fn parametric() -> Arc<dyn PremiumProvider> {
        Arc::new(FallbackPremiumProvider::parametric_only(
            ParametricPremiumEstimator::default(),
        ))
    }

    pub(crate) fn portfolio(value: i64) -> Portfolio {
        Portfolio::new(Decimal::from(value), Decimal::ZERO, PortfolioSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_strategies;

    #[test]
    fn test_build_default_strategies() {
        let names: Vec<&str> = default_strategies()
            .iter()
            .map(|c| build_strategy(&c.strategy).name())
            .collect();
        assert_eq!(
            names,
            vec!["quarterly", "conditional", "budget_ladder_lp", "scenario_floor_lp"]
        );
    }

    #[test]
    fn test_default_params_validate() {
        for config in default_strategies() {
            if let Err(e) = validate_params(&config.strategy) {
                panic!("{} defaults should validate: {e}", config.name);
            }
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RehedgeOutcome::NoProtectionNeeded.label(), "no_protection_needed");
        assert_eq!(RehedgeOutcome::skipped("x").label(), "skipped");
    }
}
