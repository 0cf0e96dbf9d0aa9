//! CSV loader for `date,close,vix` market data files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::series::{MarketData, MarketDataError, MarketSnapshot};

#[derive(Debug, Deserialize)]
struct MarketRecord {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close", with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(alias = "VIX", alias = "Vix")]
    vix: f64,
}

/// Read a market data series from any CSV source.
///
/// Rows are sorted by date before validation, so files exported in reverse
/// order load correctly; duplicate dates are still rejected.
///
/// # Errors
///
/// Returns an error if a record cannot be decoded or the resulting series is
/// invalid.
pub fn read_market_csv<R: Read>(reader: R) -> Result<MarketData, MarketDataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.deserialize() {
        let record: MarketRecord = record?;
        rows.push(MarketSnapshot::new(record.date, record.close, record.vix));
    }
    rows.sort_by_key(|r| r.date);

    MarketData::new(rows)
}

/// Load a market data series from a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn load_market_csv(path: impl AsRef<Path>) -> Result<MarketData, MarketDataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| MarketDataError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let market = read_market_csv(file)?;
    info!(
        path = %path.display(),
        rows = market.len(),
        first_date = ?market.first_date(),
        last_date = ?market.last_date(),
        "Loaded market data"
    );
    Ok(market)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_read_market_csv() {
        let csv = "date,close,vix\n2024-01-03,4450.5,19.5\n2024-01-02,4500,18\n";
        let market = match read_market_csv(csv.as_bytes()) {
            Ok(m) => m,
            Err(e) => panic!("should parse: {e}"),
        };

        assert_eq!(market.len(), 2);
        let Some(first) = market.rows().first() else {
            panic!("expected a first row");
        };
        assert_eq!(first.spot, dec!(4500));
        assert_eq!(market.rows()[1].spot, dec!(4450.5));
        assert!((market.rows()[1].volatility_proxy - 19.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_market_csv_accepts_capitalized_headers() {
        let csv = "Date,Close,VIX\n2024-01-02,4500,18\n";
        assert!(read_market_csv(csv.as_bytes()).is_ok());
    }

    #[test]
    fn test_read_market_csv_rejects_bad_number() {
        let csv = "date,close,vix\n2024-01-02,abc,18\n";
        assert!(matches!(
            read_market_csv(csv.as_bytes()),
            Err(MarketDataError::Csv(_))
        ));
    }

    #[test]
    fn test_load_market_csv_from_file() {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => panic!("temp file: {e}"),
        };
        if let Err(e) = writeln!(file, "date,close,vix\n2024-01-02,4500,18") {
            panic!("write: {e}");
        }

        let market = match load_market_csv(file.path()) {
            Ok(m) => m,
            Err(e) => panic!("should load: {e}"),
        };
        assert_eq!(market.len(), 1);
    }

    #[test]
    fn test_load_market_csv_missing_file() {
        let result = load_market_csv("/nonexistent/market.csv");
        assert!(matches!(result, Err(MarketDataError::Io { .. })));
    }
}
