//! Day-by-day hedge simulation.
//!
//! [`SimulationEngine`] drives one portfolio through a strictly increasing
//! date sequence. Per date, in fixed order:
//!
//! 1. Mark equity by the index return since the previous date.
//! 2. Settle contracts that expired or that the exercise rule flags. This
//!    runs on every date whether or not a rehedge is due.
//! 3. Invoke the strategy if the rehedge cadence has elapsed.
//! 4. Record total portfolio value.
//!
//! Runs are independent: [`ParallelRunner`] executes many of them on a
//! rayon pool, sharing only read-only market data and premium providers.

mod engine;
mod metrics;
mod output;
mod parallel;
mod types;

pub use engine::{EngineSettings, SimulationEngine};
pub use metrics::{PerformanceMetrics, max_drawdown, period_returns};
pub use output::{
    OutputError, RunOutputPaths, SimulationSummary, write_run_outputs, write_valuation_csv,
};
pub use parallel::{
    JobResult, ParallelError, ParallelResult, ParallelRunner, Progress, ProgressTracker,
    SimulationJob,
};
pub use types::{
    SimulationCounters, SimulationError, SimulationResult, SimulationState, ValuationPoint,
};
