//! Recorded option quote store with tolerance-window matching.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::QuoteLookup;
use super::types::{PremiumRequest, QuoteMiss};

/// Strike ratios offered when no recorded strikes are available.
pub const DEFAULT_STRIKE_RATIOS: [f64; 7] = [0.50, 0.60, 0.70, 0.80, 0.90, 0.95, 1.00];

const MAX_PUT_STRIKE_RATIO: f64 = 1.05;

/// One recorded option quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Quote date.
    pub date: NaiveDate,
    /// Expiry date.
    #[serde(rename = "exdate")]
    pub expiry: NaiveDate,
    /// Strike price.
    #[serde(rename = "strike_price")]
    pub strike: f64,
    /// Best bid.
    pub best_bid: f64,
    /// Best offer.
    pub best_offer: f64,
    /// `P` for puts, `C` for calls.
    pub cp_flag: char,
}

impl OptionQuote {
    /// Bid/ask midpoint.
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.best_bid + self.best_offer) / 2.0
    }

    /// Whether the quote is for a put.
    #[must_use]
    pub fn is_put(&self) -> bool {
        self.cp_flag.eq_ignore_ascii_case(&'P')
    }
}

/// Quote store loading errors.
#[derive(Debug, Error)]
pub enum QuoteStoreError {
    /// Failed to open the source file.
    #[error("Failed to read quote file '{path}': {source}")]
    Io {
        /// Source path.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to decode a CSV record.
    #[error("Failed to parse quote CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Summary of a loaded quote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteStoreStats {
    /// Put quotes held.
    pub quotes: usize,
    /// Distinct quote dates.
    pub dates: usize,
    /// Earliest quote date.
    pub first_date: Option<NaiveDate>,
    /// Latest quote date.
    pub last_date: Option<NaiveDate>,
    /// Strike tolerance (fraction of requested strike).
    pub strike_tolerance: f64,
    /// Expiry tolerance in days.
    pub expiry_tolerance_days: i64,
}

/// Read-only store of recorded put quotes, indexed by quote date.
///
/// Lookups take `&self` and never mutate, so one store can be shared across
/// concurrent simulation runs.
#[derive(Debug, Clone)]
pub struct HistoricalQuoteStore {
    by_date: BTreeMap<NaiveDate, Vec<OptionQuote>>,
    strike_tolerance: f64,
    expiry_tolerance_days: i64,
}

impl HistoricalQuoteStore {
    /// Build a store from quotes. Calls are discarded.
    #[must_use]
    pub fn new(
        quotes: impl IntoIterator<Item = OptionQuote>,
        strike_tolerance: f64,
        expiry_tolerance_days: i64,
    ) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<OptionQuote>> = BTreeMap::new();
        for quote in quotes.into_iter().filter(OptionQuote::is_put) {
            by_date.entry(quote.date).or_default().push(quote);
        }
        Self {
            by_date,
            strike_tolerance,
            expiry_tolerance_days,
        }
    }

    /// Read quotes from CSV with columns
    /// `date,exdate,strike_price,best_bid,best_offer,cp_flag`.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be decoded.
    pub fn read_csv<R: Read>(
        reader: R,
        strike_tolerance: f64,
        expiry_tolerance_days: i64,
    ) -> Result<Self, QuoteStoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let quotes = csv_reader
            .deserialize()
            .collect::<Result<Vec<OptionQuote>, _>>()?;
        Ok(Self::new(quotes, strike_tolerance, expiry_tolerance_days))
    }

    /// Load quotes from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn load_csv(
        path: impl AsRef<Path>,
        strike_tolerance: f64,
        expiry_tolerance_days: i64,
    ) -> Result<Self, QuoteStoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| QuoteStoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::read_csv(file, strike_tolerance, expiry_tolerance_days)?;
        let stats = store.stats();
        info!(
            path = %path.display(),
            quotes = stats.quotes,
            dates = stats.dates,
            first_date = ?stats.first_date,
            last_date = ?stats.last_date,
            "Loaded historical option quotes"
        );
        Ok(store)
    }

    /// Find the best recorded put for a request.
    ///
    /// Candidates must share the valuation date, expire within
    /// ± `expiry_tolerance_days` of the requested expiry, and strike within
    /// ± `strike_tolerance` of the requested strike. The closest strike wins;
    /// ties go to the closest expiry.
    ///
    /// # Errors
    ///
    /// Returns the stage at which matching failed.
    pub fn find_quote(&self, request: &PremiumRequest) -> Result<&OptionQuote, QuoteMiss> {
        let quotes = self
            .by_date
            .get(&request.valuation_date)
            .ok_or(QuoteMiss::NoQuotesForDate)?;

        let in_expiry: Vec<&OptionQuote> = quotes
            .iter()
            .filter(|q| self.expiry_matches(q.expiry, request.expiry_date))
            .collect();
        if in_expiry.is_empty() {
            return Err(QuoteMiss::NoExpiryWithinTolerance);
        }

        let strike_min = request.strike * (1.0 - self.strike_tolerance);
        let strike_max = request.strike * (1.0 + self.strike_tolerance);

        in_expiry
            .into_iter()
            .filter(|q| q.strike >= strike_min && q.strike <= strike_max)
            .min_by(|a, b| {
                let strike_a = (a.strike - request.strike).abs();
                let strike_b = (b.strike - request.strike).abs();
                strike_a.total_cmp(&strike_b).then_with(|| {
                    let exp_a = (a.expiry - request.expiry_date).num_days().abs();
                    let exp_b = (b.expiry - request.expiry_date).num_days().abs();
                    exp_a.cmp(&exp_b)
                })
            })
            .ok_or(QuoteMiss::NoStrikeWithinTolerance)
    }

    fn expiry_matches(&self, quoted: NaiveDate, requested: NaiveDate) -> bool {
        (quoted - requested).num_days().abs() <= self.expiry_tolerance_days
    }

    /// Distinct strike/spot ratios quoted for puts on `date` near `expiry`,
    /// limited to ratios at most 1.05. Falls back to
    /// [`DEFAULT_STRIKE_RATIOS`] when nothing is recorded.
    #[must_use]
    pub fn available_strike_ratios(&self, date: NaiveDate, spot: f64, expiry: NaiveDate) -> Vec<f64> {
        let ratios = self.quoted_ratios(date, spot, expiry);
        if ratios.is_empty() {
            DEFAULT_STRIKE_RATIOS.to_vec()
        } else {
            ratios
        }
    }

    fn quoted_ratios(&self, date: NaiveDate, spot: f64, expiry: NaiveDate) -> Vec<f64> {
        if spot <= 0.0 {
            return Vec::new();
        }

        let mut ratios: Vec<f64> = self
            .by_date
            .get(&date)
            .map(|quotes| {
                quotes
                    .iter()
                    .filter(|q| self.expiry_matches(q.expiry, expiry))
                    .map(|q| q.strike / spot)
                    .filter(|r| *r <= MAX_PUT_STRIKE_RATIO)
                    .collect()
            })
            .unwrap_or_default();

        ratios.sort_by(f64::total_cmp);
        ratios.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
        ratios
    }

    /// Store statistics.
    #[must_use]
    pub fn stats(&self) -> QuoteStoreStats {
        QuoteStoreStats {
            quotes: self.by_date.values().map(Vec::len).sum(),
            dates: self.by_date.len(),
            first_date: self.by_date.keys().next().copied(),
            last_date: self.by_date.keys().next_back().copied(),
            strike_tolerance: self.strike_tolerance,
            expiry_tolerance_days: self.expiry_tolerance_days,
        }
    }
}

impl QuoteLookup for HistoricalQuoteStore {
    fn lookup(&self, request: &PremiumRequest) -> Result<f64, QuoteMiss> {
        let quote = self.find_quote(request)?;
        let mid = quote.mid();
        if mid <= 0.0 || request.spot <= 0.0 {
            return Err(QuoteMiss::InvalidQuote);
        }
        Ok(mid / request.spot)
    }

    fn recorded_strike_ratios(
        &self,
        valuation_date: NaiveDate,
        spot: f64,
        expiry_date: NaiveDate,
    ) -> Vec<f64> {
        self.quoted_ratios(valuation_date, spot, expiry_date)
    }

    fn name(&self) -> &'static str {
        "historical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(2020, m, d) else {
            panic!("valid date");
        };
        date
    }

    fn quote(strike: f64, expiry: NaiveDate, bid: f64, offer: f64) -> OptionQuote {
        OptionQuote {
            date: date(3, 2),
            expiry,
            strike,
            best_bid: bid,
            best_offer: offer,
            cp_flag: 'P',
        }
    }

    fn store() -> HistoricalQuoteStore {
        HistoricalQuoteStore::new(
            vec![
                quote(3400.0, date(6, 19), 90.0, 94.0),
                quote(3500.0, date(6, 19), 110.0, 114.0),
                quote(3500.0, date(6, 12), 100.0, 104.0),
                OptionQuote {
                    cp_flag: 'C',
                    ..quote(3500.0, date(6, 19), 300.0, 310.0)
                },
            ],
            0.05,
            7,
        )
    }

    fn request(strike: f64, expiry: NaiveDate) -> PremiumRequest {
        PremiumRequest {
            strike,
            spot: 4000.0,
            valuation_date: date(3, 2),
            expiry_date: expiry,
            volatility_proxy: 30.0,
        }
    }

    #[test]
    fn test_matches_closest_strike_then_expiry() {
        let store = store();
        let Ok(found) = store.find_quote(&request(3490.0, date(6, 18))) else {
            panic!("expected a match");
        };
        assert!((found.strike - 3500.0).abs() < f64::EPSILON);
        assert_eq!(found.expiry, date(6, 19));
    }

    #[test]
    fn test_lookup_returns_mid_over_spot() {
        let store = store();
        let Ok(premium) = store.lookup(&request(3500.0, date(6, 19))) else {
            panic!("expected a premium");
        };
        assert!((premium - 112.0 / 4000.0).abs() < 1e-12);
    }

    #[test]
    fn test_miss_reasons() {
        let store = store();

        let mut wrong_day = request(3500.0, date(6, 19));
        wrong_day.valuation_date = date(3, 3);
        assert_eq!(store.lookup(&wrong_day), Err(QuoteMiss::NoQuotesForDate));

        assert_eq!(
            store.lookup(&request(3500.0, date(9, 18))),
            Err(QuoteMiss::NoExpiryWithinTolerance)
        );
        assert_eq!(
            store.lookup(&request(2500.0, date(6, 19))),
            Err(QuoteMiss::NoStrikeWithinTolerance)
        );
    }

    #[test]
    fn test_calls_are_ignored() {
        assert_eq!(store().stats().quotes, 3);
    }

    #[test]
    fn test_available_strike_ratios() {
        let store = store();
        let ratios = store.available_strike_ratios(date(3, 2), 4000.0, date(6, 19));
        assert_eq!(ratios, vec![0.85, 0.875]);

        let fallback = store.available_strike_ratios(date(3, 3), 4000.0, date(6, 19));
        assert_eq!(fallback, DEFAULT_STRIKE_RATIOS.to_vec());
    }

    #[test]
    fn test_recorded_strike_ratios_have_no_default() {
        let store = store();
        assert_eq!(
            QuoteLookup::recorded_strike_ratios(&store, date(3, 2), 4000.0, date(6, 19)),
            vec![0.85, 0.875]
        );
        assert!(QuoteLookup::recorded_strike_ratios(&store, date(3, 3), 4000.0, date(6, 19)).is_empty());
    }

    #[test]
    fn test_read_csv() {
        let csv = "date,exdate,strike_price,best_bid,best_offer,cp_flag\n\
                   2020-03-02,2020-06-19,3500,110,114,P\n\
                   2020-03-02,2020-06-19,3500,300,310,C\n";
        let store = match HistoricalQuoteStore::read_csv(csv.as_bytes(), 0.05, 7) {
            Ok(s) => s,
            Err(e) => panic!("should parse: {e}"),
        };
        let stats = store.stats();
        assert_eq!(stats.quotes, 1);
        assert_eq!(stats.first_date, Some(date(3, 2)));
    }
}
