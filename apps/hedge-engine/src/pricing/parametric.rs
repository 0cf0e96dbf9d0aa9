//! Volatility-indexed parametric put premium estimate.

use serde::{Deserialize, Serialize};

use super::types::{PremiumQuote, PremiumRequest, QuoteMiss, QuoteSource};
use super::{PremiumProvider, QuoteLookup};

/// Lowest premium fraction the estimator returns.
pub const MIN_PREMIUM_FRACTION: f64 = 0.001;

const OTM_SCALE: f64 = 0.4;
const ITM_TIME_VALUE_SCALE: f64 = 0.1;

/// Estimate a put premium as a fraction of spot.
///
/// Out of the money (strike below spot) the premium is
/// `distance × iv × √(days/365) × 0.4` with `distance = 1 − K/S`. At or in
/// the money it is intrinsic plus `iv × √(days/365) × 0.1`. The result is
/// floored at [`MIN_PREMIUM_FRACTION`].
#[must_use]
pub fn estimate_put_premium(strike: f64, spot: f64, days_to_expiry: i64, volatility_proxy: f64) -> f64 {
    if spot <= 0.0 {
        return MIN_PREMIUM_FRACTION;
    }

    let moneyness = strike / spot;
    let implied_vol = volatility_proxy / 100.0;
    let time_factor = (days_to_expiry.max(0) as f64 / 365.0).sqrt();

    let premium = if moneyness < 1.0 {
        (1.0 - moneyness) * implied_vol * time_factor * OTM_SCALE
    } else {
        (strike - spot) / spot + implied_vol * time_factor * ITM_TIME_VALUE_SCALE
    };

    premium.max(MIN_PREMIUM_FRACTION)
}

/// Parametric estimator; never misses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParametricPremiumEstimator {
    /// Volatility proxy used when the request carries an unusable reading.
    pub default_volatility_proxy: f64,
}

impl Default for ParametricPremiumEstimator {
    fn default() -> Self {
        Self {
            default_volatility_proxy: 20.0,
        }
    }
}

impl ParametricPremiumEstimator {
    /// Create an estimator with a default volatility proxy.
    #[must_use]
    pub const fn new(default_volatility_proxy: f64) -> Self {
        Self {
            default_volatility_proxy,
        }
    }

    /// Estimate the premium fraction for a request.
    #[must_use]
    pub fn estimate(&self, request: &PremiumRequest) -> f64 {
        let vol = if request.volatility_proxy.is_finite() && request.volatility_proxy > 0.0 {
            request.volatility_proxy
        } else {
            self.default_volatility_proxy
        };
        estimate_put_premium(request.strike, request.spot, request.days_to_expiry(), vol)
    }
}

impl QuoteLookup for ParametricPremiumEstimator {
    fn lookup(&self, request: &PremiumRequest) -> Result<f64, QuoteMiss> {
        Ok(self.estimate(request))
    }

    fn name(&self) -> &'static str {
        "parametric"
    }
}

impl PremiumProvider for ParametricPremiumEstimator {
    fn get_premium(&self, request: &PremiumRequest) -> PremiumQuote {
        PremiumQuote::new(self.estimate(request), QuoteSource::Parametric)
    }

    fn name(&self) -> &'static str {
        "parametric"
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_otm_put_premium() {
        // 15% OTM, 90 days, vol index 20 => ~0.6% of notional
        let premium = estimate_put_premium(3825.0, 4500.0, 90, 20.0);
        let expected = 0.15 * 0.20 * (90.0_f64 / 365.0).sqrt() * 0.4;
        assert!((premium - expected).abs() < 1e-12);
    }

    #[test]
    fn test_itm_put_premium_includes_intrinsic() {
        let premium = estimate_put_premium(5000.0, 4500.0, 90, 20.0);
        let intrinsic = 500.0 / 4500.0;
        assert!(premium > intrinsic);
        let expected = intrinsic + 0.20 * (90.0_f64 / 365.0).sqrt() * 0.1;
        assert!((premium - expected).abs() < 1e-12);
    }

    #[test_case(2250.0, 4500.0, 0, 20.0 ; "expired")]
    #[test_case(4400.0, 4500.0, 1, 0.0 ; "zero volatility")]
    #[test_case(100.0, 4500.0, 30, 20.0 ; "far otm")]
    fn test_premium_floor(strike: f64, spot: f64, days: i64, vix: f64) {
        assert!(estimate_put_premium(strike, spot, days, vix) >= MIN_PREMIUM_FRACTION);
    }

    #[test]
    fn test_premium_rises_with_volatility() {
        let calm = estimate_put_premium(4050.0, 4500.0, 90, 15.0);
        let stressed = estimate_put_premium(4050.0, 4500.0, 90, 45.0);
        assert!(stressed > calm);
    }

    #[test]
    fn test_estimator_substitutes_default_volatility() {
        let Some(today) = NaiveDate::from_ymd_opt(2024, 1, 2) else {
            panic!("valid date");
        };
        let request = PremiumRequest {
            strike: 4050.0,
            spot: 4500.0,
            valuation_date: today,
            expiry_date: today + chrono::Duration::days(90),
            volatility_proxy: f64::NAN,
        };
        let estimator = ParametricPremiumEstimator::new(20.0);
        let quote = estimator.get_premium(&request);
        assert_eq!(quote.source, QuoteSource::Parametric);
        assert!((quote.premium_fraction - estimate_put_premium(4050.0, 4500.0, 90, 20.0)).abs() < 1e-15);
    }
}
