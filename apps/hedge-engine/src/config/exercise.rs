//! Early-exercise configuration.

use serde::{Deserialize, Serialize};

/// Which exercise rule the simulation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExercisePolicy {
    /// Settle at expiry only.
    Never,
    /// Time value below a fraction of intrinsic.
    Threshold,
    /// Deep in the money after a volatility collapse.
    VolatilityRegime,
    /// Below the approximate American-put boundary near expiry.
    OptimalBoundary,
    /// Volatility regime OR optimal boundary.
    #[default]
    Hybrid,
}

/// How the time value handed to exercise rules is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeValueModel {
    /// Contracts are marked at intrinsic; time value is zero.
    #[default]
    IntrinsicOnly,
    /// Time value = provider premium − intrinsic.
    PremiumProvider,
}

/// Exercise configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseConfig {
    /// Active rule.
    #[serde(default)]
    pub policy: ExercisePolicy,
    /// Threshold rule: exercise when time value < threshold × intrinsic.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Volatility regime rule: spot/strike trigger.
    #[serde(default = "default_moneyness_trigger")]
    pub moneyness_trigger: f64,
    /// Volatility regime rule: required relative fall in the proxy.
    #[serde(default = "default_volatility_drop")]
    pub volatility_drop: f64,
    /// Optimal boundary rule: only fires with fewer days than this left.
    #[serde(default = "default_max_days_to_expiry")]
    pub max_days_to_expiry: i64,
    /// Time value source for the threshold rule.
    #[serde(default)]
    pub time_value_model: TimeValueModel,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            policy: ExercisePolicy::default(),
            threshold: default_threshold(),
            moneyness_trigger: default_moneyness_trigger(),
            volatility_drop: default_volatility_drop(),
            max_days_to_expiry: default_max_days_to_expiry(),
            time_value_model: TimeValueModel::default(),
        }
    }
}

const fn default_threshold() -> f64 {
    0.02
}

const fn default_moneyness_trigger() -> f64 {
    0.90
}

const fn default_volatility_drop() -> f64 {
    0.15
}

const fn default_max_days_to_expiry() -> i64 {
    30
}
