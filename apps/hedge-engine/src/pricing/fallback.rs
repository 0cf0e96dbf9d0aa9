//! Historical-first premium provider with parametric fallback.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use super::parametric::ParametricPremiumEstimator;
use super::types::{PremiumQuote, PremiumRequest, QuoteSource};
use super::{PremiumProvider, QuoteLookup};

/// Tries a primary quote source and falls back to the parametric estimate.
pub struct FallbackPremiumProvider {
    primary: Option<Arc<dyn QuoteLookup>>,
    fallback: ParametricPremiumEstimator,
}

impl std::fmt::Debug for FallbackPremiumProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPremiumProvider")
            .field("primary", &self.primary.as_ref().map(|p| p.name()))
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl FallbackPremiumProvider {
    /// Compose a primary source with the parametric fallback.
    #[must_use]
    pub fn new(primary: Arc<dyn QuoteLookup>, fallback: ParametricPremiumEstimator) -> Self {
        Self {
            primary: Some(primary),
            fallback,
        }
    }

    /// Parametric-only provider (no recorded quotes configured).
    #[must_use]
    pub const fn parametric_only(fallback: ParametricPremiumEstimator) -> Self {
        Self {
            primary: None,
            fallback,
        }
    }
}

impl PremiumProvider for FallbackPremiumProvider {
    fn get_premium(&self, request: &PremiumRequest) -> PremiumQuote {
        let Some(primary) = &self.primary else {
            return PremiumQuote::new(self.fallback.estimate(request), QuoteSource::Parametric);
        };

        match primary.lookup(request) {
            Ok(premium_fraction) => PremiumQuote::new(premium_fraction, QuoteSource::Historical),
            Err(reason) => {
                let premium_fraction = self.fallback.estimate(request);
                warn!(
                    source = primary.name(),
                    strike = request.strike,
                    valuation_date = %request.valuation_date,
                    expiry_date = %request.expiry_date,
                    reason = %reason,
                    premium_fraction,
                    "Stale quote fallback to parametric estimate"
                );
                PremiumQuote::new(premium_fraction, QuoteSource::StaleQuoteFallback { reason })
            }
        }
    }

    fn recorded_strike_ratios(
        &self,
        valuation_date: NaiveDate,
        spot: f64,
        expiry_date: NaiveDate,
    ) -> Option<Vec<f64>> {
        let ratios = self
            .primary
            .as_ref()?
            .recorded_strike_ratios(valuation_date, spot, expiry_date);
        (!ratios.is_empty()).then_some(ratios)
    }

    fn name(&self) -> &'static str {
        "historical_with_fallback"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};

    use super::super::{MockQuoteLookup, QuoteMiss};
    use super::*;

    fn request() -> PremiumRequest {
        let Some(today) = NaiveDate::from_ymd_opt(2020, 3, 2) else {
            panic!("valid date");
        };
        PremiumRequest {
            strike: 3500.0,
            spot: 4000.0,
            valuation_date: today,
            expiry_date: today + chrono::Duration::days(90),
            volatility_proxy: 30.0,
        }
    }

    #[test]
    fn test_uses_primary_when_available() {
        let mut primary = MockQuoteLookup::new();
        primary.expect_lookup().times(1).returning(|_| Ok(0.025));
        primary.expect_name().return_const("mock");

        let provider =
            FallbackPremiumProvider::new(Arc::new(primary), ParametricPremiumEstimator::default());
        let quote = provider.get_premium(&request());

        assert_eq!(quote.source, QuoteSource::Historical);
        assert!((quote.premium_fraction - 0.025).abs() < f64::EPSILON);
    }

    #[test]
    fn test_falls_back_and_tags_reason() {
        let mut primary = MockQuoteLookup::new();
        primary
            .expect_lookup()
            .times(1)
            .returning(|_| Err(QuoteMiss::NoStrikeWithinTolerance));
        primary.expect_name().return_const("mock");

        let estimator = ParametricPremiumEstimator::default();
        let provider = FallbackPremiumProvider::new(Arc::new(primary), estimator);
        let quote = provider.get_premium(&request());

        assert_eq!(
            quote.source,
            QuoteSource::StaleQuoteFallback {
                reason: QuoteMiss::NoStrikeWithinTolerance
            }
        );
        assert!((quote.premium_fraction - estimator.estimate(&request())).abs() < 1e-15);
    }

    #[test]
    fn test_parametric_only_is_not_a_fallback() {
        let provider = FallbackPremiumProvider::parametric_only(ParametricPremiumEstimator::default());
        let quote = provider.get_premium(&request());
        assert_eq!(quote.source, QuoteSource::Parametric);
        assert!(!quote.is_fallback());
    }

    #[test]
    fn test_recorded_strike_ratios_come_from_primary() {
        let req = request();
        let mut primary = MockQuoteLookup::new();
        primary
            .expect_recorded_strike_ratios()
            .times(2)
            .returning(|date, _, _| {
                if date.day() == 2 {
                    vec![0.85, 0.875]
                } else {
                    Vec::new()
                }
            });
        primary.expect_name().return_const("mock");
        let provider =
            FallbackPremiumProvider::new(Arc::new(primary), ParametricPremiumEstimator::default());

        assert_eq!(
            provider.recorded_strike_ratios(req.valuation_date, req.spot, req.expiry_date),
            Some(vec![0.85, 0.875])
        );
        let next_day = req.valuation_date + chrono::Duration::days(1);
        assert_eq!(
            provider.recorded_strike_ratios(next_day, req.spot, req.expiry_date),
            None
        );
    }

    #[test]
    fn test_parametric_only_records_no_strikes() {
        let req = request();
        let provider = FallbackPremiumProvider::parametric_only(ParametricPremiumEstimator::default());
        assert_eq!(
            provider.recorded_strike_ratios(req.valuation_date, req.spot, req.expiry_date),
            None
        );
    }
}
