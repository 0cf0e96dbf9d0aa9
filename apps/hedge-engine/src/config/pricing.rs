//! Premium provider configuration.

use serde::{Deserialize, Serialize};

use crate::pricing::ParametricPremiumEstimator;

/// Pricing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Strike match window as a fraction of the requested strike.
    #[serde(default = "default_strike_tolerance")]
    pub strike_tolerance: f64,
    /// Expiry match window in calendar days.
    #[serde(default = "default_expiry_tolerance_days")]
    pub expiry_tolerance_days: i64,
    /// Volatility proxy used when the market value is unusable.
    #[serde(default = "default_volatility_proxy")]
    pub default_volatility_proxy: f64,
    /// Risk-free rate (annualized).
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            strike_tolerance: default_strike_tolerance(),
            expiry_tolerance_days: default_expiry_tolerance_days(),
            default_volatility_proxy: default_volatility_proxy(),
            risk_free_rate: default_risk_free_rate(),
        }
    }
}

impl PricingConfig {
    /// Parametric estimator for this configuration.
    #[must_use]
    pub const fn parametric(&self) -> ParametricPremiumEstimator {
        ParametricPremiumEstimator::new(self.default_volatility_proxy)
    }
}

const fn default_strike_tolerance() -> f64 {
    0.05
}

const fn default_expiry_tolerance_days() -> i64 {
    7
}

const fn default_volatility_proxy() -> f64 {
    20.0
}

pub(crate) const fn default_risk_free_rate() -> f64 {
    0.045
}
