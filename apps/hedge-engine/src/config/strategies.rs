//! Named hedging strategy configuration.

use serde::{Deserialize, Serialize};

use crate::strategy::{BudgetLadderParams, ConditionalParams, QuarterlyParams, ScenarioFloorParams};

/// Strategy variant and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Fixed-cadence put purchase.
    Quarterly(QuarterlyParams),
    /// Drawdown or volatility-spike triggered purchase.
    Conditional(ConditionalParams),
    /// Budget-ladder LP.
    BudgetLadderLp(BudgetLadderParams),
    /// Scenario-floor LP.
    ScenarioFloorLp(ScenarioFloorParams),
}

/// One strategy to simulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Run name used in logs and output file names.
    pub name: String,
    /// Variant and parameters.
    pub strategy: StrategyKind,
}

impl StrategyConfig {
    /// Create a named strategy.
    #[must_use]
    pub fn new(name: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }
}

/// One run per variant with default parameters.
#[must_use]
pub fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::new("quarterly", StrategyKind::Quarterly(QuarterlyParams::default())),
        StrategyConfig::new(
            "conditional",
            StrategyKind::Conditional(ConditionalParams::default()),
        ),
        StrategyConfig::new(
            "budget_ladder",
            StrategyKind::BudgetLadderLp(BudgetLadderParams::default()),
        ),
        StrategyConfig::new(
            "scenario_floor",
            StrategyKind::ScenarioFloorLp(ScenarioFloorParams::default()),
        ),
    ]
}
