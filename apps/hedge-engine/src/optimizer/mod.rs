//! Hedge optimizer: cost-minimal put selection by linear programming.
//!
//! Both formulations minimise `Σ premium_j·(1+τ)·x_j` over non-negative
//! continuous quantities `x_j` of the candidate puts:
//!
//! - [`BudgetLadder`]: spend at most an adaptive budget `B`, and at least a
//!   fixed fraction of `B` inside each moneyness rung.
//! - [`ScenarioFloor`]: keep the hedged portfolio above `(1 − L)·V` under
//!   every supplied return scenario.
//!
//! Candidates may span several expiries; each strike/expiry pair is an
//! independent column, and the selected quantities carry their expiry.
//!
//! A zero-quantity [`HedgeSolution`] is a valid result and is reported via
//! [`HedgeSolution::is_zero_hedge`]. Contradictory constraints and solver
//! timeouts surface as [`OptimizerError::Infeasible`].

mod candidate;
mod ladder;
mod scenario;
mod solver;
mod universe;

pub use candidate::{
    CandidateOption, Formulation, HedgeSolution, RungSpend, ScenarioCheck, SelectedOption,
    ZERO_QUANTITY_TOLERANCE,
};
pub use ladder::{BudgetLadder, LadderInputs, LadderRung, default_rungs};
pub use scenario::{FloorInputs, Scenario, ScenarioCalibration, ScenarioFloor, default_scenarios};
pub use solver::SolverSettings;
pub use universe::{CandidateUniverse, UniverseSpec, build_universe};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a formulation has no solution.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfeasibleReason {
    /// Rung fractions of the non-empty rungs add up to more than the budget.
    #[error("rung fractions sum to {total_fraction:.4} of budget")]
    LadderExceedsBudget {
        /// Sum of required fractions.
        total_fraction: f64,
    },

    /// A rung marked mandatory has no candidates.
    #[error("mandatory rung '{rung}' has no candidates")]
    EmptyMandatoryRung {
        /// Rung label.
        rung: String,
    },

    /// A scenario breaches the floor and no candidate pays off in it.
    #[error("no candidate pays off in scenario '{scenario}'")]
    UnprotectableScenario {
        /// Scenario label.
        scenario: String,
    },

    /// The solver proved the constraints contradictory.
    #[error("solver reported infeasible")]
    SolverReportedInfeasible,

    /// The solve exceeded its wall-clock budget.
    #[error("solve exceeded {budget_ms}ms budget")]
    TimedOut {
        /// Budget in milliseconds.
        budget_ms: u64,
    },
}

/// Optimizer errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    /// No hedge satisfies the constraints this period.
    #[error("{formulation} infeasible: {reason}")]
    Infeasible {
        /// Formulation that failed.
        formulation: Formulation,
        /// Cause.
        reason: InfeasibleReason,
    },

    /// Inputs are out of range.
    #[error("Invalid optimizer input: {0}")]
    InvalidInput(String),

    /// Solver failed for a reason other than infeasibility.
    #[error("Solver error: {0}")]
    Solver(String),
}

impl OptimizerError {
    /// Whether this error means "no hedge available".
    #[must_use]
    pub const fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible { .. })
    }
}
