//! Request and quote types shared by premium providers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inputs needed to price a single put.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PremiumRequest {
    /// Strike price.
    pub strike: f64,
    /// Current spot price.
    pub spot: f64,
    /// Purchase / valuation date.
    pub valuation_date: NaiveDate,
    /// Option expiry date.
    pub expiry_date: NaiveDate,
    /// Volatility proxy (implied-volatility index level).
    pub volatility_proxy: f64,
}

impl PremiumRequest {
    /// Calendar days to expiry, floored at zero.
    #[must_use]
    pub fn days_to_expiry(&self) -> i64 {
        (self.expiry_date - self.valuation_date).num_days().max(0)
    }

    /// Strike over spot.
    #[must_use]
    pub fn moneyness(&self) -> f64 {
        if self.spot > 0.0 {
            self.strike / self.spot
        } else {
            0.0
        }
    }
}

/// Why a historical lookup produced no price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteMiss {
    /// No put quotes recorded for the valuation date.
    #[error("no quotes on valuation date")]
    NoQuotesForDate,
    /// No quote with an expiry inside the tolerance window.
    #[error("no expiry within tolerance")]
    NoExpiryWithinTolerance,
    /// No quote with a strike inside the tolerance window.
    #[error("no strike within tolerance")]
    NoStrikeWithinTolerance,
    /// Matched quote has a non-positive mid or spot.
    #[error("matched quote is unusable")]
    InvalidQuote,
}

/// Where a premium came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSource {
    /// Recorded market quote.
    Historical,
    /// Parametric estimate used directly.
    Parametric,
    /// Parametric estimate used because the historical lookup missed.
    StaleQuoteFallback {
        /// Reason the historical lookup missed.
        reason: QuoteMiss,
    },
}

/// A priced put.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PremiumQuote {
    /// Premium as a fraction of spot.
    pub premium_fraction: f64,
    /// Pricing source.
    pub source: QuoteSource,
}

impl PremiumQuote {
    /// Create a quote.
    #[must_use]
    pub const fn new(premium_fraction: f64, source: QuoteSource) -> Self {
        Self {
            premium_fraction,
            source,
        }
    }

    /// Whether the quote is a fallback estimate.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, QuoteSource::StaleQuoteFallback { .. })
    }

    /// Premium in currency per unit of index.
    #[must_use]
    pub fn unit_premium(&self, spot: f64) -> f64 {
        self.premium_fraction * spot
    }

    /// Split the premium into (intrinsic, time value), both in currency per
    /// unit of index. Time value is floored at zero.
    #[must_use]
    pub fn split(&self, strike: f64, spot: f64) -> (f64, f64) {
        let intrinsic = (strike - spot).max(0.0);
        let time_value = (self.unit_premium(spot) - intrinsic).max(0.0);
        (intrinsic, time_value)
    }
}
