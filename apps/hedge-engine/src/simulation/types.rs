//! Simulation state, results and errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metrics::PerformanceMetrics;
use crate::logging::HedgeEvent;
use crate::strategy::StrategyError;

/// Lifecycle of one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationState {
    /// Built, no date processed.
    Initialized,
    /// At least one date processed.
    Running,
    /// Finished; no further dates accepted.
    Completed,
}

impl std::fmt::Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized => write!(f, "INITIALIZED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Simulation errors.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A required date has no market data.
    #[error("Data gap on {date}: {details}")]
    DataGap {
        /// Missing date.
        date: NaiveDate,
        /// What was missing.
        details: String,
    },

    /// Operation not allowed in the current state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),

    /// Dates not strictly increasing.
    #[error("Simulation dates must be strictly increasing: {previous} followed by {next}")]
    InvalidDateSequence {
        /// Earlier date.
        previous: NaiveDate,
        /// Offending date.
        next: NaiveDate,
    },

    /// Strategy failed with a non-recoverable error.
    #[error("Strategy '{strategy}' failed on {date}: {source}")]
    Strategy {
        /// Strategy variant.
        strategy: String,
        /// Date of the failure.
        date: NaiveDate,
        /// Underlying error.
        #[source]
        source: StrategyError,
    },
}

/// Portfolio value on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationPoint {
    /// Date.
    pub date: NaiveDate,
    /// Equity + cash + option mark.
    pub total_value: Decimal,
    /// Index spot.
    pub spot: Decimal,
    /// Equity sleeve.
    pub equity_value: Decimal,
    /// Cash.
    pub cash: Decimal,
    /// Held puts at intrinsic.
    pub option_value: Decimal,
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationCounters {
    /// Dates processed.
    pub trading_days: u64,
    /// Dates served by forward fill.
    pub forward_filled_dates: u64,
    /// Strategy invocations that did something other than skip.
    pub rehedges: u64,
    /// Rehedges that bought puts.
    pub purchases: u64,
    /// Purchases cut down to fit funding.
    pub sized_down_purchases: u64,
    /// Optimizer returned the zero hedge.
    pub zero_hedges: u64,
    /// Optimizer found no feasible hedge.
    pub infeasible_solves: u64,
    /// Purchases refused for lack of cash.
    pub cash_refusals: u64,
    /// Strategy invocations that skipped.
    pub skipped_rehedges: u64,
    /// Contracts exercised early.
    pub exercises: u64,
    /// Contracts settled at expiry.
    pub expiries: u64,
    /// Premiums served by the fallback estimator.
    pub fallback_quotes: u64,
    /// Premiums paid including transaction costs.
    pub premiums_paid: Decimal,
    /// Payoffs credited at settlement.
    pub payoffs_realized: Decimal,
}

/// Result of a completed simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Simulation ID.
    pub simulation_id: String,
    /// Run name.
    pub run_name: String,
    /// Strategy variant.
    pub strategy: String,
    /// Exercise rule.
    pub exercise_rule: String,
    /// First simulated date.
    pub start_date: NaiveDate,
    /// Last simulated date.
    pub end_date: NaiveDate,
    /// Starting value.
    pub initial_value: Decimal,
    /// Final value.
    pub final_value: Decimal,
    /// Value per date.
    pub valuations: Vec<ValuationPoint>,
    /// Counters.
    pub counters: SimulationCounters,
    /// Performance against the unhedged index.
    pub metrics: PerformanceMetrics,
    /// Rehedge and settlement events.
    pub events: Vec<HedgeEvent>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}
