//! Portfolio and run-window configuration.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::ledger::{FundingPolicy, PortfolioSettings};
use crate::market::MissingDataPolicy;

/// Simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting portfolio value held as equity.
    #[serde(default = "default_initial_value")]
    pub initial_value: Decimal,
    /// Starting cash on top of the equity sleeve.
    #[serde(default)]
    pub initial_cash: Decimal,
    /// Beta of the equity sleeve to the index.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Index units per option contract.
    #[serde(default = "default_contract_multiplier")]
    pub contract_multiplier: u32,
    /// Option transaction cost as a fraction of premium.
    #[serde(default = "default_option_transaction_cost")]
    pub option_transaction_cost: f64,
    /// Equity transaction cost as a fraction of notional sold.
    #[serde(default = "default_equity_transaction_cost")]
    pub equity_transaction_cost: f64,
    /// How premium purchases are funded when cash is short.
    #[serde(default)]
    pub funding_policy: FundingPolicy,
    /// What to do when a simulated date has no market data.
    #[serde(default)]
    pub missing_data: MissingDataPolicy,
    /// First simulated date (defaults to the first market date).
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last simulated date (defaults to the last market date).
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_value: default_initial_value(),
            initial_cash: Decimal::ZERO,
            beta: default_beta(),
            contract_multiplier: default_contract_multiplier(),
            option_transaction_cost: default_option_transaction_cost(),
            equity_transaction_cost: default_equity_transaction_cost(),
            funding_policy: FundingPolicy::default(),
            missing_data: MissingDataPolicy::default(),
            start_date: None,
            end_date: None,
        }
    }
}

impl SimulationConfig {
    /// Ledger settings derived from this section.
    #[must_use]
    pub const fn portfolio_settings(&self) -> PortfolioSettings {
        PortfolioSettings {
            beta: self.beta,
            funding: self.funding_policy,
            equity_transaction_cost: self.equity_transaction_cost,
        }
    }
}

fn default_initial_value() -> Decimal {
    dec!(1_000_000)
}

const fn default_beta() -> f64 {
    1.0
}

const fn default_contract_multiplier() -> u32 {
    100
}

const fn default_option_transaction_cost() -> f64 {
    0.05
}

const fn default_equity_transaction_cost() -> f64 {
    0.0005
}
