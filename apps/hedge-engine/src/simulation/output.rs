//! Per-run output files.
//!
//! Each run produces `{run_name}_values.csv` with one `date,total_value`
//! row per simulated date, and `{run_name}_summary.json` with everything
//! in the result except the per-date series and event log.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::metrics::PerformanceMetrics;
use super::types::{SimulationCounters, SimulationResult, ValuationPoint};

/// Output errors.
#[derive(Debug, Error)]
pub enum OutputError {
    /// File or directory could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ValueRow {
    date: NaiveDate,
    total_value: Decimal,
}

/// Write the `date,total_value` series.
///
/// # Errors
///
/// Returns [`OutputError::Csv`] if a row cannot be written.
pub fn write_valuation_csv<W: Write>(
    writer: W,
    valuations: &[ValuationPoint],
) -> Result<(), OutputError> {
    // Header is written explicitly so an empty run still has one.
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(["date", "total_value"])?;
    for point in valuations {
        csv_writer.serialize(ValueRow {
            date: point.date,
            total_value: point.total_value,
        })?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Run result without the per-date series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Simulation ID.
    pub simulation_id: String,
    /// Run name.
    pub run_name: String,
    /// Strategy variant.
    pub strategy: String,
    /// Exercise rule.
    pub exercise_rule: String,
    /// First simulated date.
    pub start_date: NaiveDate,
    /// Last simulated date.
    pub end_date: NaiveDate,
    /// Starting value.
    pub initial_value: Decimal,
    /// Final value.
    pub final_value: Decimal,
    /// Counters.
    pub counters: SimulationCounters,
    /// Performance metrics.
    pub metrics: PerformanceMetrics,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl From<&SimulationResult> for SimulationSummary {
    fn from(result: &SimulationResult) -> Self {
        Self {
            simulation_id: result.simulation_id.clone(),
            run_name: result.run_name.clone(),
            strategy: result.strategy.clone(),
            exercise_rule: result.exercise_rule.clone(),
            start_date: result.start_date,
            end_date: result.end_date,
            initial_value: result.initial_value,
            final_value: result.final_value,
            counters: result.counters,
            metrics: result.metrics,
            duration_ms: result.duration_ms,
        }
    }
}

/// Paths written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutputPaths {
    /// Valuation series.
    pub values_csv: PathBuf,
    /// JSON summary.
    pub summary_json: PathBuf,
}

/// Write both output files for `result` under `dir`, creating it if needed.
///
/// # Errors
///
/// Returns an [`OutputError`] if the directory or either file cannot be
/// written.
pub fn write_run_outputs(
    dir: impl AsRef<Path>,
    result: &SimulationResult,
) -> Result<RunOutputPaths, OutputError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let values_csv = dir.join(format!("{}_values.csv", result.run_name));
    let file = create(&values_csv)?;
    write_valuation_csv(BufWriter::new(file), &result.valuations)?;

    let summary_json = dir.join(format!("{}_summary.json", result.run_name));
    let file = create(&summary_json)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &SimulationSummary::from(result))?;
    writer.flush().map_err(|source| OutputError::Io {
        path: summary_json.clone(),
        source,
    })?;

    info!(
        run_name = %result.run_name,
        values = %values_csv.display(),
        summary = %summary_json.display(),
        "Wrote run outputs"
    );
    Ok(RunOutputPaths {
        values_csv,
        summary_json,
    })
}

fn create(path: &Path) -> Result<File, OutputError> {
    File::create(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}
