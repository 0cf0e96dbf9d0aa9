//! Performance metrics over a valuation series.

use serde::{Deserialize, Serialize};

use crate::market::{TRADING_DAYS_PER_YEAR, annualized_volatility};

/// Summary statistics for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Final over initial value, minus one.
    pub total_return: f64,
    /// Compound annual growth rate.
    pub cagr: Option<f64>,
    /// Annualised volatility of daily returns.
    pub annualized_volatility: Option<f64>,
    /// Largest peak-to-trough decline, as a positive fraction.
    pub max_drawdown: f64,
    /// Annualised mean return over annualised downside deviation.
    pub sortino: Option<f64>,
    /// CAGR over maximum drawdown.
    pub calmar: Option<f64>,
    /// Beta of daily returns against the benchmark.
    pub beta: Option<f64>,
    /// Mean return on benchmark up days over the benchmark's.
    pub upside_capture: Option<f64>,
    /// Mean return on benchmark down days over the benchmark's.
    pub downside_capture: Option<f64>,
}

impl PerformanceMetrics {
    /// Compute metrics for `values` against a `benchmark` level series of
    /// the same length, spanning `years`.
    #[must_use]
    pub fn compute(values: &[f64], benchmark: &[f64], years: f64) -> Self {
        let (Some(first), Some(last)) = (values.first(), values.last()) else {
            return Self::default();
        };
        if *first <= 0.0 {
            return Self::default();
        }

        let total_return = last / first - 1.0;
        let cagr = (years > 0.0 && *last > 0.0).then(|| (last / first).powf(1.0 / years) - 1.0);
        let returns = period_returns(values);
        let drawdown = max_drawdown(values);

        let sortino = mean(&returns).and_then(|avg| {
            downside_deviation(&returns)
                .filter(|d| *d > 0.0)
                .map(|d| avg * TRADING_DAYS_PER_YEAR / (d * TRADING_DAYS_PER_YEAR.sqrt()))
        });
        let calmar = cagr.filter(|_| drawdown > 0.0).map(|c| c / drawdown);

        let (beta, upside_capture, downside_capture) = if benchmark.len() == values.len() {
            let bench_returns = period_returns(benchmark);
            (
                beta(&returns, &bench_returns),
                capture(&returns, &bench_returns, |b| b > 0.0),
                capture(&returns, &bench_returns, |b| b < 0.0),
            )
        } else {
            (None, None, None)
        };

        Self {
            total_return,
            cagr,
            annualized_volatility: annualized_volatility(&returns),
            max_drawdown: drawdown,
            sortino,
            calmar,
            beta,
            upside_capture,
            downside_capture,
        }
    }
}

/// Simple returns between consecutive values; one shorter than the input.
#[must_use]
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Largest peak-to-trough decline as a positive fraction.
#[must_use]
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for value in values {
        peak = peak.max(*value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Root mean square of negative returns, over the full count.
fn downside_deviation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum: f64 = values.iter().filter(|v| **v < 0.0).map(|v| v * v).sum();
    Some((sum / values.len() as f64).sqrt())
}

fn beta(returns: &[f64], benchmark: &[f64]) -> Option<f64> {
    if returns.len() < 2 || returns.len() != benchmark.len() {
        return None;
    }
    let mean_r = mean(returns)?;
    let mean_b = mean(benchmark)?;
    let covariance: f64 = returns
        .iter()
        .zip(benchmark)
        .map(|(r, b)| (r - mean_r) * (b - mean_b))
        .sum();
    let variance: f64 = benchmark.iter().map(|b| (b - mean_b).powi(2)).sum();
    (variance > 0.0).then(|| covariance / variance)
}

fn capture(returns: &[f64], benchmark: &[f64], side: impl Fn(f64) -> bool) -> Option<f64> {
    let (own, bench): (Vec<f64>, Vec<f64>) = returns
        .iter()
        .zip(benchmark)
        .filter(|(_, b)| side(**b))
        .map(|(r, b)| (*r, *b))
        .unzip();
    let bench_mean = mean(&bench)?;
    if bench_mean == 0.0 {
        return None;
    }
    mean(&own).map(|m| m / bench_mean)
}
