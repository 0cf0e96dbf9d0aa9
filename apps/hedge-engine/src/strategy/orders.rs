//! Turning sized put orders into ledger purchases.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tracing::{debug, warn};

use super::{RehedgeOutcome, RehedgeResult, StrategyContext, StrategyError};
use crate::ledger::{LedgerError, Portfolio, hedge_ratio};
use crate::optimizer::{CandidateOption, SelectedOption};
use crate::pricing::PremiumRequest;

/// A put purchase in whole contracts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PutOrder {
    pub(crate) strike: Decimal,
    pub(crate) expiry: NaiveDate,
    /// All-in premium per index unit.
    pub(crate) unit_premium: Decimal,
    pub(crate) contracts: u64,
}

/// How continuous optimizer quantities become whole contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rounding {
    /// Round down so spend never exceeds the budget.
    Down,
    /// Round up so the floor is never undershot.
    Up,
}

pub(crate) fn expiry_after(date: NaiveDate, days: u32) -> Result<NaiveDate, StrategyError> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| StrategyError::InvalidParameters(format!("expiry {days} days after {date} overflows")))
}

/// Decimal places kept on strikes.
const STRIKE_DP: u32 = 4;

/// Unrounded conversion; premiums reach the ledger at full precision.
fn to_decimal(value: f64, field: &'static str) -> Result<Decimal, StrategyError> {
    Decimal::from_f64(value).ok_or_else(|| {
        StrategyError::Ledger(LedgerError::InvalidPrice {
            field,
            value: Decimal::ZERO,
        })
    })
}

/// Orders for an optimizer selection, in whole contracts.
pub(crate) fn orders_from_selection(
    selections: &[SelectedOption],
    context: &StrategyContext<'_>,
    rounding: Rounding,
) -> Result<Vec<PutOrder>, StrategyError> {
    let multiplier = f64::from(context.trading.contract_multiplier.max(1));
    let mut orders = Vec::with_capacity(selections.len());
    for selection in selections {
        let contracts = selection.quantity / multiplier;
        let contracts = match rounding {
            Rounding::Down => contracts.floor(),
            Rounding::Up => contracts.ceil(),
        };
        if contracts < 1.0 {
            continue;
        }
        orders.push(order_for(&selection.candidate, contracts as u64, context)?);
    }
    Ok(orders)
}

fn order_for(
    candidate: &CandidateOption,
    contracts: u64,
    context: &StrategyContext<'_>,
) -> Result<PutOrder, StrategyError> {
    Ok(PutOrder {
        strike: to_decimal(candidate.strike, "strike")?.round_dp(STRIKE_DP),
        expiry: expiry_after(context.date, candidate.expiry_days)?,
        unit_premium: to_decimal(candidate.unit_cost(), "premium")?,
        contracts,
    })
}

/// Buy enough contracts at `strike_ratio × spot` to cover the portfolio's
/// beta-adjusted notional.
pub(crate) fn buy_notional_hedge(
    portfolio: &mut Portfolio,
    context: &StrategyContext<'_>,
    strike_ratio: f64,
    expiry_days: u32,
) -> Result<RehedgeResult, StrategyError> {
    let spot = context.spot();
    let multiplier = context.trading.contract_multiplier;
    let ratio = hedge_ratio(
        context.portfolio_value(portfolio),
        spot,
        portfolio.beta(),
        f64::from(multiplier),
    );
    let contracts = ratio.round();
    if contracts < 1.0 {
        return Ok(RehedgeResult::new(
            RehedgeOutcome::skipped("hedge ratio rounds to zero contracts"),
            0,
        ));
    }

    let expiry = expiry_after(context.date, expiry_days)?;
    let strike = spot * strike_ratio;
    let quote = context.premiums.get_premium(&PremiumRequest {
        strike,
        spot,
        valuation_date: context.date,
        expiry_date: expiry,
        volatility_proxy: context.snapshot.volatility_proxy,
    });
    let candidate = CandidateOption::new(
        strike,
        expiry_days,
        quote.unit_premium(spot),
        context.trading.option_transaction_cost,
    );
    let order = order_for(&candidate, contracts as u64, context)?;
    let outcome = execute_orders(portfolio, &[order], multiplier)?;
    Ok(RehedgeResult::new(outcome, usize::from(quote.is_fallback())))
}

/// Buy every order, scaling contract counts down uniformly when the funding
/// policy cannot cover the total.
pub(crate) fn execute_orders(
    portfolio: &mut Portfolio,
    orders: &[PutOrder],
    multiplier: u32,
) -> Result<RehedgeOutcome, StrategyError> {
    let units_per_contract = u64::from(multiplier.max(1));
    let cost_of = |o: &PutOrder, contracts: u64| {
        o.unit_premium * Decimal::from(contracts * units_per_contract)
    };

    let required: Decimal = orders.iter().map(|o| cost_of(o, o.contracts)).sum();
    if orders.is_empty() || required.is_zero() {
        return Ok(RehedgeOutcome::skipped("optimizer quantities round to zero contracts"));
    }

    let available = portfolio.funding_capacity();
    let mut sized_down = false;
    let mut sized: Vec<PutOrder> = orders.to_vec();
    if required > available {
        let scale = (available / required).to_f64().unwrap_or(0.0).clamp(0.0, 1.0);
        for order in &mut sized {
            order.contracts = (order.contracts as f64 * scale).floor() as u64;
        }
        sized.retain(|o| o.contracts > 0);
        if sized.is_empty() {
            warn!(required = %required, available = %available, "Cannot fund any protection");
            return Ok(RehedgeOutcome::InsufficientCash {
                required,
                available,
            });
        }
        sized_down = true;
        debug!(required = %required, available = %available, scale, "Sized orders down to funding");
    }

    let mut contracts = Vec::with_capacity(sized.len());
    let mut units = 0u64;
    let mut premium_paid = Decimal::ZERO;
    for order in &sized {
        let quantity = order.contracts * units_per_contract;
        match portfolio.buy(order.strike, order.unit_premium, order.expiry, quantity) {
            Ok(id) => {
                contracts.push(id);
                units += quantity;
                premium_paid += cost_of(order, order.contracts);
            }
            Err(LedgerError::InsufficientCash {
                required,
                available,
            }) => {
                if contracts.is_empty() {
                    return Ok(RehedgeOutcome::InsufficientCash {
                        required,
                        available,
                    });
                }
                sized_down = true;
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(RehedgeOutcome::Purchased {
        contracts,
        units,
        premium_paid,
        sized_down,
    })
}
