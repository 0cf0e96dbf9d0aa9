//! Linear program assembly and bounded-time solving.

use std::sync::mpsc;
use std::time::Duration;

use good_lp::solvers::microlp::microlp;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    variable,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Solver settings shared by both formulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Wall-clock budget per solve; `None` solves inline without a limit.
    pub time_budget: Option<Duration>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            time_budget: Some(Duration::from_secs(5)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sense {
    AtLeast,
    AtMost,
}

#[derive(Debug, Clone)]
pub(crate) struct LinearConstraint {
    pub(crate) coefficients: Vec<(usize, f64)>,
    pub(crate) sense: Sense,
    pub(crate) rhs: f64,
}

/// `min c·x` subject to row constraints and `x ≥ 0`.
#[derive(Debug, Clone, Default)]
pub(crate) struct LinearProgram {
    pub(crate) costs: Vec<f64>,
    pub(crate) constraints: Vec<LinearConstraint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SolveFailure {
    Infeasible,
    TimedOut { budget_ms: u64 },
    Other(String),
}

impl LinearProgram {
    pub(crate) fn new(costs: Vec<f64>) -> Self {
        Self {
            costs,
            constraints: Vec::new(),
        }
    }

    pub(crate) fn at_least(&mut self, coefficients: Vec<(usize, f64)>, rhs: f64) {
        self.constraints.push(LinearConstraint {
            coefficients,
            sense: Sense::AtLeast,
            rhs,
        });
    }

    pub(crate) fn at_most(&mut self, coefficients: Vec<(usize, f64)>, rhs: f64) {
        self.constraints.push(LinearConstraint {
            coefficients,
            sense: Sense::AtMost,
            rhs,
        });
    }

    fn solve(&self) -> Result<Vec<f64>, SolveFailure> {
        if self.costs.is_empty() {
            return Ok(Vec::new());
        }

        let mut vars = ProblemVariables::new();
        let x: Vec<Variable> = self
            .costs
            .iter()
            .map(|_| vars.add(variable().min(0.0)))
            .collect();

        let objective = self
            .costs
            .iter()
            .zip(&x)
            .fold(Expression::from(0.0), |acc, (&c, &v)| acc + c * v);

        let mut model = vars.minimise(objective).using(microlp);
        for row in &self.constraints {
            let lhs = row
                .coefficients
                .iter()
                .filter(|(j, _)| *j < x.len())
                .fold(Expression::from(0.0), |acc, &(j, a)| acc + a * x[j]);
            let rhs = row.rhs;
            model = match row.sense {
                Sense::AtLeast => model.with(constraint!(lhs >= rhs)),
                Sense::AtMost => model.with(constraint!(lhs <= rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => Ok(x.iter().map(|&v| solution.value(v)).collect()),
            Err(ResolutionError::Infeasible) => Err(SolveFailure::Infeasible),
            Err(other) => Err(SolveFailure::Other(other.to_string())),
        }
    }
}

/// Solve on a worker thread, giving up after the configured budget.
///
/// A timed-out worker is detached and its eventual result discarded.
pub(crate) fn solve_with_budget(
    program: LinearProgram,
    settings: &SolverSettings,
) -> Result<Vec<f64>, SolveFailure> {
    let Some(budget) = settings.time_budget else {
        return program.solve();
    };

    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("lp-solve".to_string())
        .spawn(move || {
            let _ = tx.send(program.solve());
        })
        .map_err(|e| SolveFailure::Other(format!("failed to spawn solver thread: {e}")))?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
            warn!(budget_ms, "LP solve exceeded wall-clock budget");
            Err(SolveFailure::TimedOut { budget_ms })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(SolveFailure::Other("solver thread exited without a result".to_string()))
        }
    }
}
