//! Trailing-window statistics over market history.

use rust_decimal::prelude::ToPrimitive;

use super::series::MarketSnapshot;

/// Trading days used to annualise daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Daily simple returns for a run of snapshots; the first entry is 0.
#[must_use]
pub fn daily_returns(rows: &[MarketSnapshot]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(rows.len());
    let mut previous: Option<f64> = None;
    for row in rows {
        let spot = row.spot.to_f64().unwrap_or(0.0);
        let r = match previous {
            Some(prev) if prev > 0.0 => spot / prev - 1.0,
            _ => 0.0,
        };
        returns.push(r);
        previous = Some(spot);
    }
    returns
}

/// Sample standard deviation of daily returns, annualised with √252.
///
/// Returns `None` for fewer than two observations.
#[must_use]
pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    sample_std(returns).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// The last `len` rows of a history, with their daily returns.
///
/// Returns are computed against the full history so the first row of the
/// window still carries its true return.
#[derive(Debug, Clone)]
pub struct TrailingWindow<'a> {
    rows: &'a [MarketSnapshot],
    returns: Vec<f64>,
}

impl<'a> TrailingWindow<'a> {
    /// Take the trailing `len` rows of `history`.
    #[must_use]
    pub fn new(history: &'a [MarketSnapshot], len: usize) -> Self {
        let start = history.len().saturating_sub(len);
        let anchor = start.saturating_sub(1);
        let mut returns = daily_returns(&history[anchor..]);
        if start > anchor {
            returns.remove(0);
        }
        Self {
            rows: &history[start..],
            returns,
        }
    }

    /// Number of rows in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cumulative return from the first to the last spot in the window.
    #[must_use]
    pub fn cumulative_return(&self) -> Option<f64> {
        let first = self.rows.first()?.spot.to_f64()?;
        let last = self.rows.last()?.spot.to_f64()?;
        if first <= 0.0 {
            return None;
        }
        Some(last / first - 1.0)
    }

    /// Sample standard deviation of daily returns (not annualised).
    #[must_use]
    pub fn daily_volatility(&self) -> Option<f64> {
        sample_std(&self.returns)
    }

    /// Annualised volatility over the window.
    #[must_use]
    pub fn annualized_volatility(&self) -> Option<f64> {
        annualized_volatility(&self.returns)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn rows(spots: &[i64]) -> Vec<MarketSnapshot> {
        let Some(start) = NaiveDate::from_ymd_opt(2024, 1, 1) else {
            panic!("valid date");
        };
        spots
            .iter()
            .enumerate()
            .map(|(i, s)| {
                MarketSnapshot::new(
                    start + chrono::Duration::days(i as i64),
                    Decimal::from(*s),
                    20.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_daily_returns_first_is_zero() {
        let returns = daily_returns(&rows(&[100, 110, 99]));
        assert_eq!(returns.len(), 3);
        assert!(returns[0].abs() < f64::EPSILON);
        assert!((returns[1] - 0.10).abs() < 1e-12);
        assert!((returns[2] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_annualized_volatility_needs_two_points() {
        assert!(annualized_volatility(&[0.01]).is_none());
        let Some(vol) = annualized_volatility(&[0.01, -0.01, 0.01, -0.01]) else {
            panic!("expected volatility");
        };
        assert!(vol > 0.0);
    }

    #[test]
    fn test_trailing_window_return() {
        let history = rows(&[100, 100, 100, 95]);
        let window = TrailingWindow::new(&history, 2);
        assert_eq!(window.len(), 2);
        let Some(r) = window.cumulative_return() else {
            panic!("expected return");
        };
        assert!((r + 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_trailing_window_longer_than_history() {
        let history = rows(&[100, 101]);
        let window = TrailingWindow::new(&history, 20);
        assert_eq!(window.len(), 2);
    }
}
