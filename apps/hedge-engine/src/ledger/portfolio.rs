//! Portfolio cash, equity and put holdings.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::contract::{
    ContractId, OptionContract, SettledContract, SettlementReason, SettlementReport,
};
use super::error::LedgerError;

/// How a purchase is funded when cash alone does not cover it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FundingPolicy {
    /// Refuse purchases that would drive cash negative.
    Reject,
    /// Sell equity to cover the shortfall, plus a buffer.
    LiquidateEquity {
        /// Extra fraction of the shortfall sold (0.01 sells 101%).
        #[serde(default = "default_liquidation_buffer")]
        buffer: f64,
    },
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self::LiquidateEquity {
            buffer: default_liquidation_buffer(),
        }
    }
}

pub(crate) const fn default_liquidation_buffer() -> f64 {
    0.01
}

/// Immutable portfolio parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSettings {
    /// Beta of the equity sleeve to the index.
    pub beta: f64,
    /// Funding policy for premium payments.
    pub funding: FundingPolicy,
    /// Cost of equity sales, as a fraction of notional sold.
    pub equity_transaction_cost: f64,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            beta: 1.0,
            funding: FundingPolicy::default(),
            equity_transaction_cost: 0.0005,
        }
    }
}

/// Running totals kept alongside the balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Premiums debited, including option transaction costs.
    pub premiums_paid: Decimal,
    /// Payoffs credited by settlement.
    pub payoffs_realized: Decimal,
    /// Equity sold to fund premiums.
    pub equity_liquidated: Decimal,
    /// Transaction costs on equity sales.
    pub equity_transaction_costs: Decimal,
    /// Contracts bought.
    pub contracts_bought: u64,
    /// Contracts exercised early.
    pub contracts_exercised: u64,
    /// Contracts settled at expiry.
    pub contracts_expired: u64,
}

/// One portfolio's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    cash: Decimal,
    equity_value: Decimal,
    beta: Decimal,
    settings: PortfolioSettings,
    held: Vec<OptionContract>,
    next_id: u64,
    totals: LedgerTotals,
}

/// Contracts needed to hedge `notional` with index options:
/// `notional / (spot × multiplier) × beta`.
#[must_use]
pub fn hedge_ratio(notional: f64, spot: f64, beta: f64, multiplier: f64) -> f64 {
    let denominator = spot * multiplier;
    if denominator <= 0.0 {
        return 0.0;
    }
    notional / denominator * beta.max(0.0)
}

impl Portfolio {
    /// Create a portfolio with an equity sleeve and cash.
    ///
    /// Negative inputs are clamped to zero.
    #[must_use]
    pub fn new(equity_value: Decimal, cash: Decimal, settings: PortfolioSettings) -> Self {
        Self {
            cash: cash.max(Decimal::ZERO),
            equity_value: equity_value.max(Decimal::ZERO),
            beta: Decimal::from_f64(settings.beta.max(0.0)).unwrap_or(Decimal::ONE),
            settings,
            held: Vec::new(),
            next_id: 1,
            totals: LedgerTotals::default(),
        }
    }

    /// Cash balance.
    #[must_use]
    pub const fn cash(&self) -> Decimal {
        self.cash
    }

    /// Equity sleeve value.
    #[must_use]
    pub const fn equity_value(&self) -> Decimal {
        self.equity_value
    }

    /// Portfolio beta.
    #[must_use]
    pub const fn beta(&self) -> f64 {
        self.settings.beta
    }

    /// Portfolio parameters.
    #[must_use]
    pub const fn settings(&self) -> &PortfolioSettings {
        &self.settings
    }

    /// Held contracts in purchase order.
    #[must_use]
    pub fn contracts(&self) -> &[OptionContract] {
        &self.held
    }

    /// Contracts still alive on `date`.
    pub fn active_contracts(&self, date: NaiveDate) -> impl Iterator<Item = &OptionContract> {
        self.held.iter().filter(move |c| !c.is_expired(date))
    }

    /// Running totals.
    #[must_use]
    pub const fn totals(&self) -> &LedgerTotals {
        &self.totals
    }

    /// Largest premium outlay the funding policy can cover right now.
    #[must_use]
    pub fn funding_capacity(&self) -> Decimal {
        match self.settings.funding {
            FundingPolicy::Reject => self.cash,
            FundingPolicy::LiquidateEquity { buffer } => {
                let one_plus_buffer = decimal(1.0 + buffer.max(0.0));
                let net_of_cost = Decimal::ONE - decimal(self.settings.equity_transaction_cost);
                let by_buffer = if one_plus_buffer > Decimal::ZERO {
                    self.equity_value / one_plus_buffer
                } else {
                    self.equity_value
                };
                let by_cost = self.equity_value * net_of_cost;
                self.cash + by_buffer.min(by_cost).max(Decimal::ZERO)
            }
        }
    }

    /// Buy `quantity` units of a put at `premium` per unit.
    ///
    /// Debits exactly `premium × quantity`. When cash is short the funding
    /// policy either rejects the purchase or sells equity first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientCash`] if the purchase cannot be
    /// funded, or a validation error for a zero quantity or non-positive
    /// strike / negative premium. The ledger is unchanged on error.
    pub fn buy(
        &mut self,
        strike: Decimal,
        premium: Decimal,
        expiry: NaiveDate,
        quantity: u64,
    ) -> Result<ContractId, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        if strike <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                field: "strike",
                value: strike,
            });
        }
        if premium < Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                field: "premium",
                value: premium,
            });
        }

        let cost = premium * Decimal::from(quantity);
        if cost > self.cash {
            self.fund_shortfall(cost)?;
        }

        self.cash -= cost;
        let id = ContractId(self.next_id);
        self.next_id += 1;
        self.held.push(OptionContract {
            id,
            strike,
            expiry,
            quantity,
            entry_premium: premium,
        });
        self.totals.premiums_paid += cost;
        self.totals.contracts_bought += 1;

        debug!(
            contract_id = %id,
            strike = %strike,
            premium = %premium,
            quantity,
            expiry = %expiry,
            cash = %self.cash,
            "Bought put"
        );
        Ok(id)
    }

    fn fund_shortfall(&mut self, cost: Decimal) -> Result<(), LedgerError> {
        let shortfall = cost - self.cash;
        let FundingPolicy::LiquidateEquity { buffer } = self.settings.funding else {
            return Err(LedgerError::InsufficientCash {
                required: cost,
                available: self.cash,
            });
        };

        let net_of_cost = Decimal::ONE - decimal(self.settings.equity_transaction_cost);
        if net_of_cost <= Decimal::ZERO {
            return Err(LedgerError::InsufficientCash {
                required: cost,
                available: self.cash,
            });
        }
        let buffered = shortfall * decimal(1.0 + buffer.max(0.0));
        let to_sell = buffered.max(shortfall / net_of_cost);

        if to_sell > self.equity_value {
            return Err(LedgerError::InsufficientCash {
                required: cost,
                available: self.funding_capacity(),
            });
        }

        let transaction_cost = to_sell - to_sell * net_of_cost;
        self.equity_value -= to_sell;
        self.cash += to_sell - transaction_cost;
        self.totals.equity_liquidated += to_sell;
        self.totals.equity_transaction_costs += transaction_cost;

        info!(
            equity_sold = %to_sell,
            transaction_cost = %transaction_cost,
            shortfall = %shortfall,
            "Liquidated equity to fund premium"
        );
        Ok(())
    }

    /// Mark the equity sleeve by one index return: `equity × (1 + r × beta)`.
    ///
    /// Equity is floored at zero.
    pub fn apply_index_return(&mut self, index_return: Decimal) {
        let factor = Decimal::ONE + index_return * self.beta;
        self.equity_value = (self.equity_value * factor).max(Decimal::ZERO);
    }

    /// Unrealised option value at intrinsic.
    #[must_use]
    pub fn mark_value(&self, spot: Decimal, date: NaiveDate) -> Decimal {
        self.held.iter().map(|c| c.intrinsic_value(spot, date)).sum()
    }

    /// Equity + cash + option mark.
    #[must_use]
    pub fn total_value(&self, spot: Decimal, date: NaiveDate) -> Decimal {
        self.equity_value + self.cash + self.mark_value(spot, date)
    }

    /// Remove every contract that is expired on `date` or listed in
    /// `exercised`, crediting `max(strike − spot, 0) × quantity` for each.
    ///
    /// Identifiers not held are ignored, so a contract can only be settled
    /// once.
    pub fn settle_expired_and_exercised(
        &mut self,
        spot: Decimal,
        date: NaiveDate,
        exercised: &HashSet<ContractId>,
    ) -> SettlementReport {
        let mut report = SettlementReport::default();
        let mut kept = Vec::with_capacity(self.held.len());

        for contract in self.held.drain(..) {
            let reason = if contract.is_expired(date) {
                SettlementReason::Expired
            } else if exercised.contains(&contract.id) {
                SettlementReason::Exercised
            } else {
                kept.push(contract);
                continue;
            };

            let payoff = contract.payoff(spot);
            report.payoff_total += payoff;
            report.settled.push(SettledContract {
                contract,
                reason,
                payoff,
            });
        }
        self.held = kept;

        self.cash += report.payoff_total;
        self.totals.payoffs_realized += report.payoff_total;
        self.totals.contracts_exercised += report.exercised_count() as u64;
        self.totals.contracts_expired += report.expired_count() as u64;

        if !report.is_empty() {
            info!(
                date = %date,
                spot = %spot,
                settled = report.settled.len(),
                exercised = report.exercised_count(),
                expired = report.expired_count(),
                payoff_total = %report.payoff_total,
                "Settled puts"
            );
        }
        report
    }
}

fn decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}
