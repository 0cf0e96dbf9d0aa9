//! Option lifecycle ledger.
//!
//! A [`Portfolio`] owns an index-tracking equity sleeve, a cash balance and
//! the put contracts bought to protect it. Contracts enter through
//! [`Portfolio::buy`] and leave exactly once through
//! [`Portfolio::settle_expired_and_exercised`], which is the only path by
//! which option value becomes cash.

mod contract;
mod error;
mod portfolio;

pub use contract::{ContractId, OptionContract, SettledContract, SettlementReason, SettlementReport};
pub use error::LedgerError;
pub use portfolio::{FundingPolicy, LedgerTotals, Portfolio, PortfolioSettings, hedge_ratio};
