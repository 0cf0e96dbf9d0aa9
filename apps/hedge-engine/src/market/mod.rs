//! Market data boundary for the simulation engine.
//!
//! A [`MarketData`] series is a strictly increasing, date-indexed sequence of
//! [`MarketSnapshot`]s carrying the index spot price and a volatility proxy
//! (an implied-volatility index level such as VIX). The series is read-only
//! once built and is shared across simulation runs behind an `Arc`.
//!
//! # Gap Handling
//!
//! A date the engine asks for that is absent from the series is a
//! [`MarketDataError::DataGap`] unless [`MissingDataPolicy::ForwardFill`] is
//! configured, in which case the most recent prior snapshot is reused.

mod loader;
mod series;
mod stats;

pub use loader::{load_market_csv, read_market_csv};
pub use series::{MarketData, MarketDataError, MarketSnapshot, MissingDataPolicy, ResolvedSnapshot};
pub use stats::{TRADING_DAYS_PER_YEAR, TrailingWindow, annualized_volatility, daily_returns};
