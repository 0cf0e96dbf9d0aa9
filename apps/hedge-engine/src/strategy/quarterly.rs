//! Fixed-cadence protective puts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::orders::buy_notional_hedge;
use super::{
    HedgeStrategy, RehedgeResult, StrategyContext, StrategyError, check, check_expiries,
};
use crate::ledger::Portfolio;

/// Quarterly strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarterlyParams {
    /// Calendar days between purchases.
    pub rehedge_interval_days: u32,
    /// Strike as a fraction of spot.
    pub strike_ratio: f64,
    /// Calendar days to expiry.
    pub expiry_days: u32,
}

impl Default for QuarterlyParams {
    fn default() -> Self {
        Self {
            rehedge_interval_days: 90,
            strike_ratio: 0.85,
            expiry_days: 90,
        }
    }
}

impl QuarterlyParams {
    pub(crate) fn validate(&self) -> Result<(), StrategyError> {
        check(self.rehedge_interval_days > 0, "rehedge_interval_days must be positive")?;
        check(
            self.strike_ratio > 0.0 && self.strike_ratio.is_finite(),
            "strike_ratio must be positive",
        )?;
        check_expiries(&[self.expiry_days])
    }
}

/// Buys a fixed-moneyness put sized to the hedge ratio every interval.
#[derive(Debug, Clone)]
pub struct QuarterlyStrategy {
    params: QuarterlyParams,
}

impl QuarterlyStrategy {
    /// Create the strategy.
    #[must_use]
    pub const fn new(params: QuarterlyParams) -> Self {
        Self { params }
    }
}

impl HedgeStrategy for QuarterlyStrategy {
    fn name(&self) -> &'static str {
        "quarterly"
    }

    fn rehedge_interval_days(&self) -> Option<u32> {
        Some(self.params.rehedge_interval_days)
    }

    fn rehedge(
        &self,
        portfolio: &mut Portfolio,
        context: &StrategyContext<'_>,
    ) -> Result<RehedgeResult, StrategyError> {
        debug!(date = %context.date, strike_ratio = self.params.strike_ratio, "Quarterly rehedge");
        buy_notional_hedge(
            portfolio,
            context,
            self.params.strike_ratio,
            self.params.expiry_days,
        )
    }
}
