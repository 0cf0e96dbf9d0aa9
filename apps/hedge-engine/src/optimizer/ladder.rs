//! Budget-ladder formulation.
//!
//! The budget scales with the volatility proxy and with beta above one:
//!
//! ```text
//! B = V × base_rate × (vol_proxy / reference_vol) × max(1, β)
//! ```
//!
//! Candidates are bucketed by out-of-the-money distance into rungs; each
//! non-empty rung must receive at least its fraction of `B`, and total
//! spend may not exceed `B`. Rungs with no candidates are dropped unless
//! marked required.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::candidate::{clean_quantities, total_cost};
use super::solver::{LinearProgram, SolveFailure, solve_with_budget};
use super::{
    CandidateOption, Formulation, HedgeSolution, InfeasibleReason, OptimizerError, RungSpend,
    SolverSettings,
};

const FRACTION_TOLERANCE: f64 = 1e-9;
/// Slack on rung edges so grid strikes at `spot × ratio` bucket the same
/// way at every index level.
const EDGE_TOLERANCE: f64 = 1e-9;

/// One moneyness bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderRung {
    /// Label for logs and reports.
    pub label: String,
    /// Inclusive lower OTM bound.
    pub min_otm: f64,
    /// Exclusive upper OTM bound.
    pub max_otm: f64,
    /// Minimum share of the budget spent in this rung.
    pub budget_fraction: f64,
    /// Fail instead of dropping when the rung has no candidates.
    #[serde(default)]
    pub required: bool,
}

impl LadderRung {
    /// Create an optional rung.
    #[must_use]
    pub fn new(label: impl Into<String>, min_otm: f64, max_otm: f64, budget_fraction: f64) -> Self {
        Self {
            label: label.into(),
            min_otm,
            max_otm,
            budget_fraction,
            required: false,
        }
    }

    /// Mark the rung as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn contains(&self, otm: f64) -> bool {
        let otm = otm + EDGE_TOLERANCE;
        otm >= self.min_otm && otm < self.max_otm
    }
}

/// Shallow, medium, deep and catastrophic rungs.
#[must_use]
pub fn default_rungs() -> Vec<LadderRung> {
    vec![
        LadderRung::new("shallow", 0.05, 0.15, 0.05),
        LadderRung::new("medium", 0.15, 0.25, 0.15),
        LadderRung::new("deep", 0.25, 0.40, 0.30),
        LadderRung::new("catastrophic", 0.40, 1.00, 0.50),
    ]
}

/// Market inputs for one ladder solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderInputs {
    /// Current portfolio value `V`.
    pub portfolio_value: f64,
    /// Index level.
    pub spot: f64,
    /// Portfolio beta.
    pub beta: f64,
    /// Volatility proxy (VIX points).
    pub volatility_proxy: f64,
}

/// Budget-ladder LP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLadder {
    /// Budget as a fraction of `V` at the reference volatility.
    pub base_rate: f64,
    /// Volatility proxy at which the budget equals `base_rate × V`.
    pub reference_volatility: f64,
    /// Moneyness rungs.
    pub rungs: Vec<LadderRung>,
}

impl Default for BudgetLadder {
    fn default() -> Self {
        Self {
            base_rate: 0.01,
            reference_volatility: 20.0,
            rungs: default_rungs(),
        }
    }
}

impl BudgetLadder {
    /// Adaptive budget `B`.
    #[must_use]
    pub fn budget(&self, inputs: &LadderInputs) -> f64 {
        if self.reference_volatility <= 0.0 {
            return 0.0;
        }
        let scale = (inputs.volatility_proxy / self.reference_volatility).max(0.0);
        inputs.portfolio_value * self.base_rate * scale * inputs.beta.max(1.0)
    }

    /// Index of the rung containing the candidate, if any.
    #[must_use]
    pub fn rung_of(&self, candidate: &CandidateOption, spot: f64) -> Option<usize> {
        let otm = candidate.otm_distance(spot);
        self.rungs.iter().position(|rung| rung.contains(otm))
    }

    fn validate(&self, inputs: &LadderInputs) -> Result<(), OptimizerError> {
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
        if let Some(rung) = self
            .rungs
            .iter()
            .find(|r| !(0.0..=1.0).contains(&r.budget_fraction) || r.min_otm >= r.max_otm)
        {
            return Err(OptimizerError::InvalidInput(format!(
                "rung '{}' is malformed",
                rung.label
            )));
        }
        Ok(())
    }

    /// Solve for the cheapest ladder-compliant hedge.
    pub fn solve(
        &self,
        candidates: &[CandidateOption],
        inputs: &LadderInputs,
        settings: &SolverSettings,
    ) -> Result<HedgeSolution, OptimizerError> {
        self.validate(inputs)?;

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); self.rungs.len()];
        for (j, candidate) in candidates.iter().enumerate() {
            if let Some(r) = self.rung_of(candidate, inputs.spot) {
                members[r].push(j);
            }
        }

        if let Some((rung, _)) = self
            .rungs
            .iter()
            .zip(&members)
            .find(|(rung, m)| rung.required && m.is_empty())
        {
            return Err(infeasible(InfeasibleReason::EmptyMandatoryRung {
                rung: rung.label.clone(),
            }));
        }

        let budget = self.budget(inputs);
        if budget <= 0.0 || candidates.is_empty() {
            debug!(budget, candidates = candidates.len(), "Ladder budget is zero; no hedge");
            let mut solution = HedgeSolution::zero(Formulation::BudgetLadder, candidates.len());
            solution.budget = Some(budget.max(0.0));
            return Ok(solution);
        }

        for (rung, m) in self.rungs.iter().zip(&members) {
            if m.is_empty() {
                warn!(rung = %rung.label, "Ladder rung has no candidates; dropping");
            }
        }

        let total_fraction: f64 = self
            .rungs
            .iter()
            .zip(&members)
            .filter(|(_, m)| !m.is_empty())
            .map(|(rung, _)| rung.budget_fraction)
            .sum();
        if total_fraction > 1.0 + FRACTION_TOLERANCE {
            return Err(infeasible(InfeasibleReason::LadderExceedsBudget { total_fraction }));
        }

        let costs: Vec<f64> = candidates.iter().map(CandidateOption::unit_cost).collect();
        let mut program = LinearProgram::new(costs.clone());
        program.at_most(costs.iter().copied().enumerate().collect(), budget);
        for (rung, m) in self.rungs.iter().zip(&members) {
            if m.is_empty() || rung.budget_fraction <= 0.0 {
                continue;
            }
            program.at_least(
                m.iter().map(|&j| (j, costs[j])).collect(),
                rung.budget_fraction * budget,
            );
        }

        let quantities = clean_quantities(solve_with_budget(program, settings).map_err(map_failure)?);

        let rung_spend = self
            .rungs
            .iter()
            .zip(&members)
            .map(|(rung, m)| RungSpend {
                label: rung.label.clone(),
                candidates: m.len(),
                required: if m.is_empty() {
                    0.0
                } else {
                    rung.budget_fraction * budget
                },
                spent: m.iter().map(|&j| costs[j] * quantities[j]).sum(),
            })
            .collect();

        let total = total_cost(candidates, &quantities);
        debug!(budget, total_cost = total, total_fraction, "Budget ladder solved");

        Ok(HedgeSolution {
            formulation: Formulation::BudgetLadder,
            quantities,
            total_cost: total,
            budget: Some(budget),
            rung_spend,
            scenario_checks: Vec::new(),
        })
    }
}

const fn infeasible(reason: InfeasibleReason) -> OptimizerError {
    OptimizerError::Infeasible {
        formulation: Formulation::BudgetLadder,
        reason,
    }
}

fn map_failure(failure: SolveFailure) -> OptimizerError {
    match failure {
        SolveFailure::Infeasible => infeasible(InfeasibleReason::SolverReportedInfeasible),
        SolveFailure::TimedOut { budget_ms } => infeasible(InfeasibleReason::TimedOut { budget_ms }),
        SolveFailure::Other(message) => OptimizerError::Solver(message),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SPOT: f64 = 4500.0;

    fn inputs(volatility_proxy: f64, beta: f64) -> LadderInputs {
        LadderInputs {
            portfolio_value: 1_000_000.0,
            spot: SPOT,
            beta,
            volatility_proxy,
        }
    }

    fn grid() -> Vec<CandidateOption> {
        (1..=12)
            .map(|i| {
                let otm = f64::from(i) * 0.05;
                let strike = SPOT * (1.0 - otm);
                CandidateOption::new(strike, 90, 200.0 * (1.0 - otm).powi(4), 0.05)
            })
            .collect()
    }

    #[test]
    fn test_budget_scales_with_volatility_and_beta() {
        let ladder = BudgetLadder::default();
        assert!((ladder.budget(&inputs(20.0, 1.0)) - 10_000.0).abs() < 1e-6);
        assert!((ladder.budget(&inputs(40.0, 1.0)) - 20_000.0).abs() < 1e-6);
        assert!((ladder.budget(&inputs(20.0, 1.5)) - 15_000.0).abs() < 1e-6);
        // Beta below one does not shrink the budget.
        assert!((ladder.budget(&inputs(20.0, 0.5)) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_rung_assignment() {
        let ladder = BudgetLadder::default();
        let atm = CandidateOption::new(SPOT, 90, 100.0, 0.0);
        let shallow = CandidateOption::new(SPOT * 0.90, 90, 50.0, 0.0);
        let deep = CandidateOption::new(SPOT * 0.70, 90, 5.0, 0.0);
        assert_eq!(ladder.rung_of(&atm, SPOT), None);
        assert_eq!(ladder.rung_of(&shallow, SPOT), Some(0));
        assert_eq!(ladder.rung_of(&deep, SPOT), Some(2));
    }

    #[test]
    fn test_grid_buckets_identically_across_spot_levels() {
        use crate::optimizer::UniverseSpec;

        let ladder = BudgetLadder::default();
        let ratios = UniverseSpec::otm_grid(90, 0.0).strike_ratios;
        let bucket = |spot: f64| -> Vec<Option<usize>> {
            ratios
                .iter()
                .map(|ratio| ladder.rung_of(&CandidateOption::new(spot * ratio, 90, 1.0, 0.0), spot))
                .collect()
        };

        let expected = vec![
            Some(0),
            Some(0),
            Some(1),
            Some(1),
            Some(2),
            Some(2),
            Some(2),
            Some(3),
            Some(3),
            Some(3),
            Some(3),
            Some(3),
        ];
        for spot in [4500.0, 2237.4, 3333.33, 1234.56, 987.1] {
            assert_eq!(bucket(spot), expected, "spot {spot}");
        }
    }

    #[test]
    fn test_solution_respects_budget_and_rungs() {
        let ladder = BudgetLadder::default();
        let candidates = grid();
        let inputs = inputs(20.0, 1.0);
        let solution = match ladder.solve(&candidates, &inputs, &SolverSettings::default()) {
            Ok(s) => s,
            Err(e) => panic!("ladder should be feasible: {e}"),
        };

        let budget = ladder.budget(&inputs);
        assert!(solution.total_cost <= budget * (1.0 + 1e-6));
        for spend in &solution.rung_spend {
            assert!(
                spend.spent >= spend.required * (1.0 - 1e-6),
                "rung {} underfunded",
                spend.label
            );
        }
        assert!(!solution.is_zero_hedge());
    }

    #[test]
    fn test_zero_budget_gives_zero_hedge() {
        let ladder = BudgetLadder::default();
        let Ok(solution) = ladder.solve(&grid(), &inputs(0.0, 1.0), &SolverSettings::default())
        else {
            panic!("zero budget is not an error");
        };
        assert!(solution.is_zero_hedge());
        assert_eq!(solution.budget, Some(0.0));
    }

    #[test]
    fn test_empty_optional_rung_is_dropped() {
        let ladder = BudgetLadder::default();
        // Only shallow candidates.
        let candidates = vec![
            CandidateOption::new(SPOT * 0.95, 90, 60.0, 0.0),
            CandidateOption::new(SPOT * 0.90, 90, 35.0, 0.0),
        ];
        let Ok(solution) = ladder.solve(&candidates, &inputs(20.0, 1.0), &SolverSettings::default())
        else {
            panic!("dropped rungs should leave a feasible problem");
        };
        assert!(solution.rung_spend[0].spent >= 0.05 * 10_000.0 * (1.0 - 1e-6));
        assert!(solution.rung_spend[1].required.abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_required_rung_is_infeasible() {
        let mut ladder = BudgetLadder::default();
        ladder.rungs[3] = ladder.rungs[3].clone().required();
        let candidates = vec![CandidateOption::new(SPOT * 0.90, 90, 35.0, 0.0)];

        let result = ladder.solve(&candidates, &inputs(20.0, 1.0), &SolverSettings::default());
        let Err(OptimizerError::Infeasible { reason, .. }) = result else {
            panic!("expected infeasible, got {result:?}");
        };
        assert_eq!(
            reason,
            InfeasibleReason::EmptyMandatoryRung {
                rung: "catastrophic".to_string()
            }
        );
    }

    #[test]
    fn test_fractions_over_one_are_infeasible() {
        let ladder = BudgetLadder {
            rungs: vec![
                LadderRung::new("a", 0.0, 0.2, 0.7),
                LadderRung::new("b", 0.2, 1.0, 0.6),
            ],
            ..BudgetLadder::default()
        };
        let result = ladder.solve(&grid(), &inputs(20.0, 1.0), &SolverSettings::default());
        let Err(err) = result else {
            panic!("expected infeasible");
        };
        assert!(err.is_infeasible());
        assert!(err.to_string().contains("BUDGET_LADDER"));
    }

    #[test]
    fn test_rejects_non_positive_spot() {
        let ladder = BudgetLadder::default();
        let mut bad = inputs(20.0, 1.0);
        bad.spot = 0.0;
        assert!(matches!(
            ladder.solve(&grid(), &bad, &SolverSettings::default()),
            Err(OptimizerError::InvalidInput(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_budget_and_rung_floors_hold(
            vol in 5.0f64..80.0,
            beta in 0.3f64..2.0,
            value in 10_000.0f64..5_000_000.0,
        ) {
            let ladder = BudgetLadder::default();
            let inputs = LadderInputs { portfolio_value: value, spot: SPOT, beta, volatility_proxy: vol };
            let solution = ladder
                .solve(&grid(), &inputs, &SolverSettings { time_budget: None })
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let budget = ladder.budget(&inputs);
            prop_assert!(solution.total_cost <= budget * (1.0 + 1e-6) + 1e-6);
            for spend in &solution.rung_spend {
                prop_assert!(spend.spent >= spend.required * (1.0 - 1e-6) - 1e-6);
            }
        }
    }
}
