//! Put premium providers.
//!
//! Premia are quoted as a fraction of spot (0.02 = 2% of notional) so that
//! the optimizer and the ledger can scale them to any position size.
//!
//! Two sources exist:
//!
//! - [`HistoricalQuoteStore`]: bid/ask mid of a recorded put quote matched
//!   within strike and expiry tolerance windows. A lookup may miss.
//! - [`ParametricPremiumEstimator`]: volatility-indexed estimate that always
//!   produces a price.
//!
//! [`FallbackPremiumProvider`] composes the two behind the [`PremiumProvider`]
//! boundary. It never fails; every estimate produced after a historical miss
//! is tagged [`QuoteSource::StaleQuoteFallback`] and logged.

mod fallback;
mod historical;
mod parametric;
mod types;

pub use fallback::FallbackPremiumProvider;
pub use historical::{
    DEFAULT_STRIKE_RATIOS, HistoricalQuoteStore, OptionQuote, QuoteStoreError, QuoteStoreStats,
};
pub use parametric::{MIN_PREMIUM_FRACTION, ParametricPremiumEstimator, estimate_put_premium};
pub use types::{PremiumQuote, PremiumRequest, QuoteMiss, QuoteSource};

use chrono::NaiveDate;

/// Fallible quote lookup against a single pricing source.
#[cfg_attr(test, mockall::automock)]
pub trait QuoteLookup: Send + Sync {
    /// Premium as a fraction of spot, or the reason no price was found.
    fn lookup(&self, request: &PremiumRequest) -> Result<f64, QuoteMiss>;

    /// Strike/spot ratios of puts recorded on `valuation_date` near
    /// `expiry_date`, ascending. Empty when the source records no strikes.
    fn recorded_strike_ratios(
        &self,
        _valuation_date: NaiveDate,
        _spot: f64,
        _expiry_date: NaiveDate,
    ) -> Vec<f64> {
        Vec::new()
    }

    /// Source name for logging.
    fn name(&self) -> &'static str;
}

/// Infallible premium boundary consumed by strategies and exercise rules.
#[cfg_attr(test, mockall::automock)]
pub trait PremiumProvider: Send + Sync {
    /// Price a put for the given request.
    fn get_premium(&self, request: &PremiumRequest) -> PremiumQuote;

    /// Strike ratios backed by recorded quotes for this date and expiry, or
    /// `None` when the provider has none and callers should use their grid.
    fn recorded_strike_ratios(
        &self,
        _valuation_date: NaiveDate,
        _spot: f64,
        _expiry_date: NaiveDate,
    ) -> Option<Vec<f64>> {
        None
    }

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
