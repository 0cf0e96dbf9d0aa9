//! Date-indexed spot and volatility-proxy series.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of market state for a single date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Valuation date.
    pub date: NaiveDate,
    /// Index spot (close) price.
    pub spot: Decimal,
    /// Volatility proxy reading (implied-volatility index level, e.g. 18.5).
    pub volatility_proxy: f64,
}

impl MarketSnapshot {
    /// Create a new snapshot.
    #[must_use]
    pub const fn new(date: NaiveDate, spot: Decimal, volatility_proxy: f64) -> Self {
        Self {
            date,
            spot,
            volatility_proxy,
        }
    }
}

/// How the engine treats a requested date that the series does not contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataPolicy {
    /// Missing dates are a fatal data gap.
    #[default]
    Error,
    /// Reuse the most recent prior snapshot.
    ForwardFill,
}

/// Snapshot returned for a requested date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSnapshot {
    /// Requested date.
    pub date: NaiveDate,
    /// Market state used for that date.
    pub snapshot: MarketSnapshot,
    /// True when `snapshot` came from an earlier date.
    pub forward_filled: bool,
}

/// Market data errors.
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// A required date has no market data.
    #[error("Data gap at {date}: {details}")]
    DataGap {
        /// Date that could not be resolved.
        date: NaiveDate,
        /// What was missing.
        details: String,
    },

    /// Dates are not strictly increasing.
    #[error("Market data dates must be strictly increasing: {previous} followed by {next}")]
    NonIncreasingDates {
        /// Earlier row date.
        previous: NaiveDate,
        /// Offending row date.
        next: NaiveDate,
    },

    /// A row carries an unusable value.
    #[error("Invalid market data row at {date}: {reason}")]
    InvalidRow {
        /// Row date.
        date: NaiveDate,
        /// Reason the row was rejected.
        reason: String,
    },

    /// Series has no rows.
    #[error("Market data series is empty")]
    Empty,

    /// Failed to open the source file.
    #[error("Failed to read market data '{path}': {source}")]
    Io {
        /// Source path.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to decode a CSV record.
    #[error("Failed to parse market data CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Strictly increasing market data series.
#[derive(Debug, Clone)]
pub struct MarketData {
    rows: Vec<MarketSnapshot>,
}

impl MarketData {
    /// Build a series from rows already in date order.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows are empty, not strictly increasing, or
    /// carry a non-positive spot or a negative/non-finite volatility proxy.
    pub fn new(rows: Vec<MarketSnapshot>) -> Result<Self, MarketDataError> {
        if rows.is_empty() {
            return Err(MarketDataError::Empty);
        }

        for row in &rows {
            if row.spot <= Decimal::ZERO {
                return Err(MarketDataError::InvalidRow {
                    date: row.date,
                    reason: format!("spot must be positive, got {}", row.spot),
                });
            }
            if !row.volatility_proxy.is_finite() || row.volatility_proxy < 0.0 {
                return Err(MarketDataError::InvalidRow {
                    date: row.date,
                    reason: format!(
                        "volatility proxy must be finite and non-negative, got {}",
                        row.volatility_proxy
                    ),
                });
            }
        }

        for pair in rows.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(MarketDataError::NonIncreasingDates {
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }

        Ok(Self { rows })
    }

    /// All rows in date order.
    #[must_use]
    pub fn rows(&self) -> &[MarketSnapshot] {
        &self.rows
    }

    /// Dates covered by the series, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the series is empty (never true for a constructed series).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First date in the series.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    /// Last date in the series.
    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Exact lookup.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&MarketSnapshot> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// Most recent snapshot on or before `date`.
    #[must_use]
    pub fn latest_on_or_before(&self, date: NaiveDate) -> Option<&MarketSnapshot> {
        let end = self.rows.partition_point(|r| r.date <= date);
        end.checked_sub(1).map(|idx| &self.rows[idx])
    }

    /// Rows up to and including `date`.
    #[must_use]
    pub fn history_through(&self, date: NaiveDate) -> &[MarketSnapshot] {
        let end = self.rows.partition_point(|r| r.date <= date);
        &self.rows[..end]
    }

    /// Resolve the market state for `date` under the given gap policy.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::DataGap`] when the date is missing and the
    /// policy is [`MissingDataPolicy::Error`], or when no earlier row exists
    /// to forward-fill from.
    pub fn resolve(
        &self,
        date: NaiveDate,
        policy: MissingDataPolicy,
    ) -> Result<ResolvedSnapshot, MarketDataError> {
        if let Some(snapshot) = self.get(date) {
            return Ok(ResolvedSnapshot {
                date,
                snapshot: *snapshot,
                forward_filled: false,
            });
        }

        match policy {
            MissingDataPolicy::Error => Err(MarketDataError::DataGap {
                date,
                details: "no market data for date".to_string(),
            }),
            MissingDataPolicy::ForwardFill => self
                .latest_on_or_before(date)
                .map(|snapshot| ResolvedSnapshot {
                    date,
                    snapshot: *snapshot,
                    forward_filled: true,
                })
                .ok_or_else(|| MarketDataError::DataGap {
                    date,
                    details: "no earlier market data to forward-fill from".to_string(),
                }),
        }
    }
}
