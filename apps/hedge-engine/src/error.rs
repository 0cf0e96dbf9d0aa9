//! Crate-wide error type.
//!
//! Each component owns its error enum; [`HedgeError`] wraps them at the
//! process edge. Only a market data gap is fatal: it breaks the
//! time-ordered valuation series. Every other failure mode surfaces earlier
//! as a recoverable value (a [`crate::strategy::RehedgeOutcome`] or a
//! [`crate::pricing::QuoteSource::StaleQuoteFallback`] tag).

use thiserror::Error;

use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::market::MarketDataError;
use crate::optimizer::OptimizerError;
use crate::pricing::QuoteStoreError;
use crate::simulation::{OutputError, ParallelError, SimulationError};
use crate::strategy::StrategyError;

/// Any error raised by the hedge engine.
#[derive(Debug, Error)]
pub enum HedgeError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Market data could not be loaded or resolved.
    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    /// Option quote store could not be loaded.
    #[error(transparent)]
    QuoteStore(#[from] QuoteStoreError),

    /// Ledger rejected an operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Optimizer failed.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Strategy failed.
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// Simulation aborted.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Parallel batch failed.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// Results could not be written.
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl HedgeError {
    /// Whether the error is a data gap that invalidates the run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MarketData(MarketDataError::DataGap { .. })
                | Self::Simulation(SimulationError::DataGap { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::optimizer::{Formulation, InfeasibleReason};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default()
    }

    #[test]
    fn test_only_data_gap_is_fatal() {
        let gap: HedgeError = SimulationError::DataGap {
            date: day(),
            details: "missing".to_string(),
        }
        .into();
        assert!(gap.is_fatal());

        let market_gap: HedgeError = MarketDataError::DataGap {
            date: day(),
            details: "missing".to_string(),
        }
        .into();
        assert!(market_gap.is_fatal());

        let cash: HedgeError = LedgerError::InsufficientCash {
            required: dec!(10),
            available: dec!(5),
        }
        .into();
        assert!(!cash.is_fatal());

        let infeasible: HedgeError = OptimizerError::Infeasible {
            formulation: Formulation::ScenarioFloor,
            reason: InfeasibleReason::SolverReportedInfeasible,
        }
        .into();
        assert!(!infeasible.is_fatal());
    }

    #[test]
    fn test_display_is_transparent() {
        let err: HedgeError = SimulationError::InvalidState("already completed".to_string()).into();
        assert!(err.to_string().contains("already completed"));
    }
}
