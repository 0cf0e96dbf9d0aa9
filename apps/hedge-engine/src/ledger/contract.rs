//! Put contracts held by a portfolio.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger-assigned contract identifier, unique within one portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub u64);

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "put-{}", self.0)
    }
}

/// A purchased put position.
///
/// `quantity` counts index units of protection; a contract multiplier is
/// applied by the caller before purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Identifier.
    pub id: ContractId,
    /// Strike price.
    pub strike: Decimal,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Units held.
    pub quantity: u64,
    /// Premium paid per unit, including transaction costs.
    pub entry_premium: Decimal,
}

impl OptionContract {
    /// Put payoff at `spot`: `max(strike − spot, 0) × quantity`.
    #[must_use]
    pub fn payoff(&self, spot: Decimal) -> Decimal {
        (self.strike - spot).max(Decimal::ZERO) * Decimal::from(self.quantity)
    }

    /// Intrinsic mark; zero on or after expiry.
    #[must_use]
    pub fn intrinsic_value(&self, spot: Decimal, date: NaiveDate) -> Decimal {
        if self.is_expired(date) {
            Decimal::ZERO
        } else {
            self.payoff(spot)
        }
    }

    /// Whether `date` has reached or passed expiry.
    #[must_use]
    pub fn is_expired(&self, date: NaiveDate) -> bool {
        date >= self.expiry
    }

    /// Calendar days remaining, floored at zero.
    #[must_use]
    pub fn days_to_expiry(&self, date: NaiveDate) -> i64 {
        (self.expiry - date).num_days().max(0)
    }

    /// Total premium paid.
    #[must_use]
    pub fn entry_cost(&self) -> Decimal {
        self.entry_premium * Decimal::from(self.quantity)
    }
}

/// Why a contract left the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementReason {
    /// Reached or passed expiry.
    Expired,
    /// Exercised early.
    Exercised,
}

/// A contract removed by settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledContract {
    /// The removed contract.
    pub contract: OptionContract,
    /// Removal reason.
    pub reason: SettlementReason,
    /// Cash credited.
    pub payoff: Decimal,
}

/// Result of one settlement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Contracts removed, in ledger order.
    pub settled: Vec<SettledContract>,
    /// Sum of credited payoffs.
    pub payoff_total: Decimal,
}

impl SettlementReport {
    /// Number of contracts exercised early.
    #[must_use]
    pub fn exercised_count(&self) -> usize {
        self.settled
            .iter()
            .filter(|s| s.reason == SettlementReason::Exercised)
            .count()
    }

    /// Number of contracts that expired.
    #[must_use]
    pub fn expired_count(&self) -> usize {
        self.settled
            .iter()
            .filter(|s| s.reason == SettlementReason::Expired)
            .count()
    }

    /// Whether nothing was settled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}
