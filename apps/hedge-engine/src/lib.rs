// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Hedge Engine - Rust Core Library
//!
//! Put-hedge optimization and simulation for an index-tracking retirement
//! portfolio.
//!
//! # Components (bottom-up)
//!
//! - `market`: date-indexed spot and volatility-proxy series, gap policy
//! - `pricing`: premium providers (historical quotes, parametric estimate,
//!   fallback composite)
//! - `ledger`: cash, equity sleeve and put contracts from purchase to
//!   settlement
//! - `exercise`: stateless early-exercise rules
//! - `optimizer`: Budget-Ladder and Scenario-Floor linear programs over a
//!   multi-expiry candidate universe
//! - `strategy`: rehedge policies built on the above
//! - `simulation`: the per-date loop, metrics, outputs and parallel runs
//!
//! Only a market data gap aborts a run. Cash refusals, infeasible programs
//! and stale-quote fallbacks are reported as values.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Ambient
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Crate-wide error type.
pub mod error;

/// Structured simulation events and tracing setup.
pub mod logging;

// =============================================================================
// Core
// =============================================================================

/// Market data series.
pub mod market;

/// Put premium providers.
pub mod pricing;

/// Option lifecycle ledger.
pub mod ledger;

/// Early-exercise rules.
pub mod exercise;

/// Hedge optimizer.
pub mod optimizer;

/// Rehedge strategies.
pub mod strategy;

/// Simulation engine.
pub mod simulation;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{HedgeEngineConfig, load_config, load_config_from_string};
pub use error::HedgeError;
pub use exercise::{ExerciseContext, ExerciseRule, build_rule};
pub use ledger::{ContractId, FundingPolicy, LedgerError, OptionContract, Portfolio};
pub use market::{MarketData, MarketSnapshot, MissingDataPolicy, load_market_csv};
pub use optimizer::{
    BudgetLadder, CandidateOption, HedgeSolution, InfeasibleReason, OptimizerError, Scenario,
    ScenarioFloor,
};
pub use pricing::{
    FallbackPremiumProvider, HistoricalQuoteStore, ParametricPremiumEstimator, PremiumProvider,
    PremiumQuote, PremiumRequest, QuoteSource,
};
pub use simulation::{ParallelRunner, SimulationEngine, SimulationJob, SimulationResult};
pub use strategy::{HedgeStrategy, RehedgeOutcome, build_strategy};
