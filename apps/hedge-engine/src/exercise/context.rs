//! Per-contract, per-date exercise decision inputs.

use serde::{Deserialize, Serialize};

/// Read-only snapshot evaluated by exercise rules. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseContext {
    /// Current spot.
    pub spot: f64,
    /// Contract strike.
    pub strike: f64,
    /// Calendar days to expiry.
    pub days_to_expiry: i64,
    /// Current volatility proxy reading (index points, e.g. 25.0).
    pub volatility_proxy: f64,
    /// Prior volatility proxy reading, if any.
    pub volatility_proxy_previous: Option<f64>,
    /// Annualised risk-free rate.
    pub risk_free_rate: f64,
    /// Estimated time value per unit; zero under an intrinsic-only pricer.
    pub time_value: f64,
}

impl ExerciseContext {
    /// `max(strike − spot, 0)` per unit.
    #[must_use]
    pub fn intrinsic(&self) -> f64 {
        (self.strike - self.spot).max(0.0)
    }

    /// Whether the put is in the money.
    #[must_use]
    pub fn is_in_the_money(&self) -> bool {
        self.intrinsic() > 0.0
    }

    /// `spot / strike`.
    #[must_use]
    pub fn moneyness(&self) -> f64 {
        if self.strike > 0.0 {
            self.spot / self.strike
        } else {
            f64::INFINITY
        }
    }

    /// Annualised volatility implied by the proxy (proxy / 100).
    #[must_use]
    pub fn volatility(&self) -> f64 {
        self.volatility_proxy / 100.0
    }

    /// Fractional change of the proxy since the prior reading.
    ///
    /// `None` when there is no usable prior reading.
    #[must_use]
    pub fn volatility_proxy_change(&self) -> Option<f64> {
        match self.volatility_proxy_previous {
            Some(previous) if previous > 0.0 => Some((self.volatility_proxy - previous) / previous),
            _ => None,
        }
    }

    /// Years to expiry on a 365-day basis.
    #[must_use]
    pub fn years_to_expiry(&self) -> f64 {
        self.days_to_expiry.max(0) as f64 / 365.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_quantities() {
        let context = ExerciseContext {
            spot: 3600.0,
            strike: 4000.0,
            days_to_expiry: 73,
            volatility_proxy: 40.0,
            volatility_proxy_previous: Some(50.0),
            risk_free_rate: 0.045,
            time_value: 0.0,
        };
        assert!((context.intrinsic() - 400.0).abs() < 1e-12);
        assert!((context.moneyness() - 0.9).abs() < 1e-12);
        assert!((context.volatility() - 0.4).abs() < 1e-12);
        assert!((context.years_to_expiry() - 0.2).abs() < 1e-12);
        let Some(change) = context.volatility_proxy_change() else {
            panic!("prior reading is valid");
        };
        assert!((change + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_proxy_change_requires_positive_prior() {
        let context = ExerciseContext {
            spot: 3600.0,
            strike: 4000.0,
            days_to_expiry: 10,
            volatility_proxy: 40.0,
            volatility_proxy_previous: Some(0.0),
            risk_free_rate: 0.045,
            time_value: 0.0,
        };
        assert!(context.volatility_proxy_change().is_none());
    }
}
