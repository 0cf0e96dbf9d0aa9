//! Scenario-floor formulation.
//!
//! For every scenario `s` with index return `r_s` the hedged portfolio must
//! stay above the floor:
//!
//! ```text
//! V(1 + β·r_s) + Σ_j x_j · max(K_j − S(1 + r_s), 0) ≥ (1 − L)·V
//! ```
//!
//! Scenarios whose unhedged value already clears the floor impose no
//! constraint. A scenario below the floor where no candidate pays off makes
//! the problem infeasible.
//!
//! The adverse scenarios can optionally be recalibrated to recent realized
//! volatility (see [`ScenarioCalibration`]). In calm regimes this shrinks
//! the modelled crash until it no longer breaches the floor, and the
//! formulation returns a zero hedge.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::candidate::{clean_quantities, total_cost};
use super::solver::{LinearProgram, SolveFailure, solve_with_budget};
use super::{
    CandidateOption, Formulation, HedgeSolution, InfeasibleReason, OptimizerError, ScenarioCheck,
    SolverSettings,
};

/// A single index-return scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Label for logs and reports.
    pub label: String,
    /// Index return applied instantaneously.
    #[serde(alias = "return")]
    pub index_return: f64,
}

impl Scenario {
    /// Create a scenario.
    #[must_use]
    pub fn new(label: impl Into<String>, index_return: f64) -> Self {
        Self {
            label: label.into(),
            index_return,
        }
    }

    /// Whether the scenario loses money.
    #[must_use]
    pub fn is_adverse(&self) -> bool {
        self.index_return < 0.0
    }
}

/// Crash, mild decline and rally.
#[must_use]
pub fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("crash", -0.40),
        Scenario::new("mild_decline", -0.10),
        Scenario::new("rally", 0.10),
    ]
}

/// How adverse scenario returns are set before each solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScenarioCalibration {
    /// Use scenario returns as configured.
    #[default]
    Fixed,
    /// Clamp adverse returns to `−z·σ·√(horizon/365)` using realized volatility.
    VolatilityScaled {
        /// Standard-normal quantile.
        #[serde(default = "default_z")]
        z: f64,
        /// Horizon in calendar days.
        #[serde(default = "default_horizon_days")]
        horizon_days: u32,
        /// Trading days of history for realized volatility.
        #[serde(default = "default_lookback_days")]
        lookback_days: usize,
    },
}

const fn default_z() -> f64 {
    2.33
}

const fn default_horizon_days() -> u32 {
    90
}

const fn default_lookback_days() -> usize {
    252
}

impl ScenarioCalibration {
    /// Trading days of history this calibration needs, if any.
    #[must_use]
    pub const fn lookback_days(&self) -> Option<usize> {
        match self {
            Self::Fixed => None,
            Self::VolatilityScaled { lookback_days, .. } => Some(*lookback_days),
        }
    }

    /// Apply calibration given annualized realized volatility.
    ///
    /// Without a volatility estimate the scenarios are returned unchanged.
    #[must_use]
    pub fn calibrate(&self, scenarios: &[Scenario], realized_volatility: Option<f64>) -> Vec<Scenario> {
        let Self::VolatilityScaled { z, horizon_days, .. } = *self else {
            return scenarios.to_vec();
        };
        let Some(sigma) = realized_volatility.filter(|s| s.is_finite() && *s >= 0.0) else {
            debug!("No realized volatility available; scenarios left uncalibrated");
            return scenarios.to_vec();
        };

        let worst = -z * sigma * (f64::from(horizon_days) / 365.0).sqrt();
        scenarios
            .iter()
            .map(|s| {
                if s.is_adverse() {
                    Scenario::new(s.label.clone(), s.index_return.max(worst))
                } else {
                    s.clone()
                }
            })
            .collect()
    }
}

/// Market inputs for one floor solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorInputs {
    /// Current portfolio value `V`.
    pub portfolio_value: f64,
    /// Index level.
    pub spot: f64,
    /// Portfolio beta.
    pub beta: f64,
}

/// Scenario-floor LP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFloor {
    /// Maximum tolerated loss `L` as a fraction of `V`.
    pub max_loss: f64,
}

impl Default for ScenarioFloor {
    fn default() -> Self {
        Self { max_loss: 0.20 }
    }
}

impl ScenarioFloor {
    /// Create a floor with maximum loss `L`.
    #[must_use]
    pub const fn new(max_loss: f64) -> Self {
        Self { max_loss }
    }

    fn validate(&self, inputs: &FloorInputs, scenarios: &[Scenario]) -> Result<(), OptimizerError> {
        if !(0.0..1.0).contains(&self.max_loss) {
            return Err(OptimizerError::InvalidInput(format!(
                "max loss must be in [0, 1), got {}",
                self.max_loss
            )));
        }
        if !inputs.portfolio_value.is_finite() || inputs.portfolio_value < 0.0 {
            return Err(OptimizerError::InvalidInput(format!(
                "portfolio value must be non-negative, got {}",
                inputs.portfolio_value
            )));
        }
        if !inputs.spot.is_finite() || inputs.spot <= 0.0 {
            return Err(OptimizerError::InvalidInput(format!(
                "spot must be positive, got {}",
                inputs.spot
            )));
        }
        if scenarios.is_empty() {
            return Err(OptimizerError::InvalidInput(
                "at least one scenario is required".to_string(),
            ));
        }
        if let Some(s) = scenarios.iter().find(|s| s.index_return <= -1.0) {
            return Err(OptimizerError::InvalidInput(format!(
                "scenario '{}' return must exceed -100%",
                s.label
            )));
        }
        Ok(())
    }

    /// Solve for the cheapest hedge meeting the floor in every scenario.
    pub fn solve(
        &self,
        candidates: &[CandidateOption],
        inputs: &FloorInputs,
        scenarios: &[Scenario],
        settings: &SolverSettings,
    ) -> Result<HedgeSolution, OptimizerError> {
        self.validate(inputs, scenarios)?;
        if !scenarios.iter().any(Scenario::is_adverse) {
            warn!("No adverse scenario supplied; floor cannot bind");
        }

        let value = inputs.portfolio_value;
        let floor = (1.0 - self.max_loss) * value;
        let costs: Vec<f64> = candidates.iter().map(CandidateOption::unit_cost).collect();
        let mut program = LinearProgram::new(costs);

        for scenario in scenarios {
            let unhedged = value * (1.0 + inputs.beta * scenario.index_return);
            let shortfall = floor - unhedged;
            if shortfall <= 0.0 {
                continue;
            }
            let level = inputs.spot * (1.0 + scenario.index_return);
            let row: Vec<(usize, f64)> = candidates
                .iter()
                .enumerate()
                .map(|(j, c)| (j, c.payoff_at(level)))
                .filter(|(_, payoff)| *payoff > 0.0)
                .collect();
            if row.is_empty() {
                return Err(OptimizerError::Infeasible {
                    formulation: Formulation::ScenarioFloor,
                    reason: InfeasibleReason::UnprotectableScenario {
                        scenario: scenario.label.clone(),
                    },
                });
            }
            program.at_least(row, shortfall);
        }

        let binding = program.constraints.len();
        let quantities = if binding == 0 {
            vec![0.0; candidates.len()]
        } else {
            clean_quantities(solve_with_budget(program, settings).map_err(map_failure)?)
        };

        let scenario_checks = scenarios
            .iter()
            .map(|s| {
                let level = inputs.spot * (1.0 + s.index_return);
                let payoff: f64 = candidates
                    .iter()
                    .zip(&quantities)
                    .map(|(c, q)| c.payoff_at(level) * q)
                    .sum();
                let unhedged_value = value * (1.0 + inputs.beta * s.index_return);
                ScenarioCheck {
                    label: s.label.clone(),
                    index_return: s.index_return,
                    unhedged_value,
                    hedged_value: unhedged_value + payoff,
                    floor,
                }
            })
            .collect();

        let total = total_cost(candidates, &quantities);
        debug!(binding, floor, total_cost = total, "Scenario floor solved");

        Ok(HedgeSolution {
            formulation: Formulation::ScenarioFloor,
            quantities,
            total_cost: total,
            budget: None,
            rung_spend: Vec::new(),
            scenario_checks,
        })
    }
}

fn map_failure(failure: SolveFailure) -> OptimizerError {
    let reason = match failure {
        SolveFailure::Infeasible => InfeasibleReason::SolverReportedInfeasible,
        SolveFailure::TimedOut { budget_ms } => InfeasibleReason::TimedOut { budget_ms },
        SolveFailure::Other(message) => return OptimizerError::Solver(message),
    };
    OptimizerError::Infeasible {
        formulation: Formulation::ScenarioFloor,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> FloorInputs {
        FloorInputs {
            portfolio_value: 1_000_000.0,
            spot: 4500.0,
            beta: 1.0,
        }
    }

    #[test]
    fn test_single_put_meets_crash_floor() {
        let floor = ScenarioFloor::new(0.20);
        let candidates = vec![CandidateOption::new(4050.0, 90, 100.0, 0.0)];
        let scenarios = vec![Scenario::new("crash", -0.30)];

        let solution = match floor.solve(&candidates, &inputs(), &scenarios, &SolverSettings::default()) {
            Ok(s) => s,
            Err(e) => panic!("should be feasible: {e}"),
        };

        // Shortfall 100,000 over payoff 900 per unit.
        let expected = 100_000.0 / 900.0;
        assert!((solution.quantities[0] - expected).abs() < 1e-4);
        assert!(solution.scenario_checks.iter().all(ScenarioCheck::floor_met));
    }

    #[test]
    fn test_cheaper_expiry_selected() {
        let floor = ScenarioFloor::new(0.20);
        let candidates = vec![
            CandidateOption::new(4050.0, 90, 90.0, 0.0),
            CandidateOption::new(4050.0, 30, 50.0, 0.0),
        ];
        let scenarios = vec![Scenario::new("crash", -0.30)];
        let Ok(solution) = floor.solve(&candidates, &inputs(), &scenarios, &SolverSettings::default())
        else {
            panic!("should be feasible");
        };
        assert!(solution.quantities[0].abs() < 1e-9);
        assert!(solution.quantities[1] > 0.0);
    }

    #[test]
    fn test_floor_already_met_gives_zero_hedge() {
        let floor = ScenarioFloor::new(0.20);
        let candidates = vec![CandidateOption::new(4050.0, 90, 100.0, 0.0)];
        let scenarios = vec![Scenario::new("mild", -0.10), Scenario::new("rally", 0.10)];
        let Ok(solution) = floor.solve(&candidates, &inputs(), &scenarios, &SolverSettings::default())
        else {
            panic!("should be feasible");
        };
        assert!(solution.is_zero_hedge());
        assert!(solution.total_cost.abs() < f64::EPSILON);
    }

    #[test]
    fn test_unprotectable_scenario() {
        let floor = ScenarioFloor::new(0.20);
        // Strike far below the crash level pays nothing.
        let candidates = vec![CandidateOption::new(2000.0, 90, 1.0, 0.0)];
        let scenarios = vec![Scenario::new("crash", -0.30)];
        let result = floor.solve(&candidates, &inputs(), &scenarios, &SolverSettings::default());
        let Err(OptimizerError::Infeasible { reason, formulation }) = result else {
            panic!("expected infeasible, got {result:?}");
        };
        assert_eq!(formulation, Formulation::ScenarioFloor);
        assert!(matches!(reason, InfeasibleReason::UnprotectableScenario { .. }));
    }

    #[test]
    fn test_rejects_bad_max_loss() {
        let floor = ScenarioFloor::new(1.0);
        let result = floor.solve(&[], &inputs(), &default_scenarios(), &SolverSettings::default());
        assert!(matches!(result, Err(OptimizerError::InvalidInput(_))));
    }

    #[test]
    fn test_calibration_clamps_adverse_returns_only() {
        let calibration = ScenarioCalibration::VolatilityScaled {
            z: 2.33,
            horizon_days: 90,
            lookback_days: 252,
        };
        let calibrated = calibration.calibrate(&default_scenarios(), Some(0.15));

        let worst = -2.33 * 0.15 * (90.0f64 / 365.0).sqrt();
        assert!((calibrated[0].index_return - worst).abs() < 1e-12);
        assert!((calibrated[1].index_return - (-0.10)).abs() < 1e-12);
        assert!((calibrated[2].index_return - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_without_volatility_is_identity() {
        let calibration = ScenarioCalibration::VolatilityScaled {
            z: 2.33,
            horizon_days: 90,
            lookback_days: 252,
        };
        assert_eq!(calibration.calibrate(&default_scenarios(), None), default_scenarios());
        assert_eq!(
            ScenarioCalibration::Fixed.calibrate(&default_scenarios(), Some(0.5)),
            default_scenarios()
        );
    }

    #[test]
    fn test_calm_calibration_yields_zero_hedge() {
        let calibration = ScenarioCalibration::VolatilityScaled {
            z: 2.33,
            horizon_days: 90,
            lookback_days: 252,
        };
        let scenarios = calibration.calibrate(&[Scenario::new("crash", -0.48)], Some(0.15));
        let candidates = vec![CandidateOption::new(4050.0, 90, 100.0, 0.0)];
        let Ok(solution) = ScenarioFloor::new(0.20).solve(
            &candidates,
            &inputs(),
            &scenarios,
            &SolverSettings::default(),
        ) else {
            panic!("calibrated problem is feasible");
        };
        assert!(solution.is_zero_hedge());
    }
}
