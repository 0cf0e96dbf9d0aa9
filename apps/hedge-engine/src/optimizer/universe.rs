//! Candidate universe construction.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CandidateOption;
use crate::pricing::{PremiumProvider, PremiumRequest};

/// Strike grid and expiries offered to the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseSpec {
    /// Strikes as fractions of spot.
    pub strike_ratios: Vec<f64>,
    /// Calendar days to expiry.
    pub expiry_days: Vec<u32>,
    /// Option transaction cost as a fraction of premium.
    pub transaction_cost_rate: f64,
    /// Use the provider's recorded strikes for an expiry when it has any,
    /// instead of `strike_ratios`.
    #[serde(default)]
    pub recorded_strikes: bool,
}

impl UniverseSpec {
    /// OTM grid from 5% to 60% in 5% steps at a single expiry.
    #[must_use]
    pub fn otm_grid(expiry_days: u32, transaction_cost_rate: f64) -> Self {
        Self {
            strike_ratios: (1..=12).map(|i| 1.0 - f64::from(i) * 0.05).collect(),
            expiry_days: vec![expiry_days],
            transaction_cost_rate,
            recorded_strikes: false,
        }
    }
}

/// Priced candidates plus pricing diagnostics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateUniverse {
    /// Candidates grouped by expiry, strikes in ratio order within each.
    pub candidates: Vec<CandidateOption>,
    /// Quotes served by the fallback estimator.
    pub fallback_quotes: usize,
    /// Expiries whose strikes came from recorded quotes.
    pub recorded_expiries: usize,
}

impl CandidateUniverse {
    /// Whether any candidate was priced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Price every strike/expiry pair with `provider`.
///
/// With `recorded_strikes` set, each expiry takes its strikes from
/// [`PremiumProvider::recorded_strike_ratios`] and keeps the grid only when
/// nothing is recorded. Pairs with a non-positive strike or premium are
/// skipped.
#[must_use]
pub fn build_universe(
    provider: &dyn PremiumProvider,
    spot: f64,
    valuation_date: NaiveDate,
    volatility_proxy: f64,
    spec: &UniverseSpec,
) -> CandidateUniverse {
    let mut universe = CandidateUniverse::default();
    if spot <= 0.0 {
        return universe;
    }

    for &days in &spec.expiry_days {
        let Some(expiry_date) = valuation_date.checked_add_days(Days::new(u64::from(days))) else {
            continue;
        };
        let recorded = if spec.recorded_strikes {
            provider.recorded_strike_ratios(valuation_date, spot, expiry_date)
        } else {
            None
        };
        if recorded.is_some() {
            universe.recorded_expiries += 1;
        }
        let ratios = recorded.as_deref().unwrap_or(spec.strike_ratios.as_slice());

        for &ratio in ratios {
            let strike = spot * ratio;
            if strike <= 0.0 {
                continue;
            }
            let quote = provider.get_premium(&PremiumRequest {
                strike,
                spot,
                valuation_date,
                expiry_date,
                volatility_proxy,
            });
            if quote.is_fallback() {
                universe.fallback_quotes += 1;
            }
            let premium = quote.unit_premium(spot);
            if premium <= 0.0 || !premium.is_finite() {
                continue;
            }
            universe.candidates.push(CandidateOption::new(
                strike,
                days,
                premium,
                spec.transaction_cost_rate,
            ));
        }
    }

    debug!(
        provider = provider.name(),
        candidates = universe.candidates.len(),
        fallback_quotes = universe.fallback_quotes,
        recorded_expiries = universe.recorded_expiries,
        "Candidate universe built"
    );
    universe
}
