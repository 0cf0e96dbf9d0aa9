//! Candidate puts and optimizer solutions.

use serde::{Deserialize, Serialize};

/// Quantities at or below this are treated as zero.
pub const ZERO_QUANTITY_TOLERANCE: f64 = 1e-9;

/// Which linear program produced a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Formulation {
    /// Adaptive budget with moneyness rungs.
    BudgetLadder,
    /// Per-scenario value floor.
    ScenarioFloor,
}

impl std::fmt::Display for Formulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BudgetLadder => write!(f, "BUDGET_LADDER"),
            Self::ScenarioFloor => write!(f, "SCENARIO_FLOOR"),
        }
    }
}

/// A put offered to the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateOption {
    /// Strike price.
    pub strike: f64,
    /// Calendar days to expiry.
    pub expiry_days: u32,
    /// Premium per unit of index, in currency.
    pub premium: f64,
    /// Transaction cost as a fraction of premium.
    pub transaction_cost_rate: f64,
}

impl CandidateOption {
    /// Create a candidate.
    #[must_use]
    pub const fn new(strike: f64, expiry_days: u32, premium: f64, transaction_cost_rate: f64) -> Self {
        Self {
            strike,
            expiry_days,
            premium,
            transaction_cost_rate,
        }
    }

    /// All-in cost per unit: `premium × (1 + τ)`.
    #[must_use]
    pub fn unit_cost(&self) -> f64 {
        self.premium * (1.0 + self.transaction_cost_rate)
    }

    /// Put payoff per unit at an index level.
    #[must_use]
    pub fn payoff_at(&self, index_level: f64) -> f64 {
        (self.strike - index_level).max(0.0)
    }

    /// Fractional out-of-the-money distance: `(spot − strike) / spot`.
    #[must_use]
    pub fn otm_distance(&self, spot: f64) -> f64 {
        if spot > 0.0 {
            (spot - self.strike) / spot
        } else {
            0.0
        }
    }
}

/// Spend achieved inside one ladder rung.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RungSpend {
    /// Rung label.
    pub label: String,
    /// Candidates that fell in the rung.
    pub candidates: usize,
    /// Minimum spend required (zero for dropped rungs).
    pub required: f64,
    /// Spend in the solution.
    pub spent: f64,
}

/// Floor check for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCheck {
    /// Scenario label.
    pub label: String,
    /// Index return applied.
    pub index_return: f64,
    /// Portfolio value without the hedge.
    pub unhedged_value: f64,
    /// Portfolio value including hedge payoff.
    pub hedged_value: f64,
    /// Required floor.
    pub floor: f64,
}

impl ScenarioCheck {
    /// Whether the hedged value meets the floor (with a small tolerance).
    #[must_use]
    pub fn floor_met(&self) -> bool {
        self.hedged_value >= self.floor - 1e-6 * self.floor.abs().max(1.0)
    }
}

/// A candidate with a positive quantity in a solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Selected candidate.
    pub candidate: CandidateOption,
    /// Continuous quantity in index units.
    pub quantity: f64,
}

/// Result of a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeSolution {
    /// Formulation used.
    pub formulation: Formulation,
    /// Quantity per candidate, aligned with the candidate slice.
    pub quantities: Vec<f64>,
    /// `Σ unit_cost_j · x_j`.
    pub total_cost: f64,
    /// Budget `B` (ladder only).
    pub budget: Option<f64>,
    /// Per-rung spend (ladder only).
    pub rung_spend: Vec<RungSpend>,
    /// Per-scenario floor checks (scenario floor only).
    pub scenario_checks: Vec<ScenarioCheck>,
}

impl HedgeSolution {
    /// All-zero solution over `n` candidates.
    #[must_use]
    pub fn zero(formulation: Formulation, n: usize) -> Self {
        Self {
            formulation,
            quantities: vec![0.0; n],
            total_cost: 0.0,
            budget: None,
            rung_spend: Vec::new(),
            scenario_checks: Vec::new(),
        }
    }

    /// Whether no protection is bought.
    #[must_use]
    pub fn is_zero_hedge(&self) -> bool {
        self.quantities.iter().all(|q| *q <= ZERO_QUANTITY_TOLERANCE)
    }

    /// Candidates with positive quantities.
    #[must_use]
    pub fn selections(&self, candidates: &[CandidateOption]) -> Vec<SelectedOption> {
        candidates
            .iter()
            .zip(&self.quantities)
            .filter(|(_, q)| **q > ZERO_QUANTITY_TOLERANCE)
            .map(|(candidate, quantity)| SelectedOption {
                candidate: *candidate,
                quantity: *quantity,
            })
            .collect()
    }
}

/// Snap near-zero and negative solver output to zero.
pub(crate) fn clean_quantities(raw: Vec<f64>) -> Vec<f64> {
    raw.into_iter()
        .map(|q| if q.is_finite() && q > ZERO_QUANTITY_TOLERANCE { q } else { 0.0 })
        .collect()
}

/// `Σ unit_cost_j · x_j`.
pub(crate) fn total_cost(candidates: &[CandidateOption], quantities: &[f64]) -> f64 {
    candidates
        .iter()
        .zip(quantities)
        .map(|(c, q)| c.unit_cost() * q)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cost_includes_transaction_cost() {
        let candidate = CandidateOption::new(4050.0, 90, 100.0, 0.05);
        assert!((candidate.unit_cost() - 105.0).abs() < 1e-12);
    }

    #[test]
    fn test_payoff_and_otm_distance() {
        let candidate = CandidateOption::new(4050.0, 90, 100.0, 0.0);
        assert!((candidate.payoff_at(3150.0) - 900.0).abs() < 1e-12);
        assert!(candidate.payoff_at(4600.0).abs() < f64::EPSILON);
        assert!((candidate.otm_distance(4500.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_solution() {
        let solution = HedgeSolution::zero(Formulation::ScenarioFloor, 3);
        assert!(solution.is_zero_hedge());
        assert!(solution.selections(&[CandidateOption::new(1.0, 1, 1.0, 0.0); 3]).is_empty());
    }

    #[test]
    fn test_clean_quantities() {
        assert_eq!(clean_quantities(vec![-1e-12, 1e-12, 2.5, f64::NAN]), vec![0.0, 0.0, 2.5, 0.0]);
    }

    #[test]
    fn test_formulation_display() {
        assert_eq!(Formulation::BudgetLadder.to_string(), "BUDGET_LADDER");
    }
}
