//! Independent simulation runs on a rayon pool.
//!
//! Every job builds its own portfolio, strategy and exercise rule; the
//! market series and premium provider are shared read-only behind `Arc`s.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, debug, error, info, span};

use super::engine::SimulationEngine;
use super::types::{SimulationError, SimulationResult};
use crate::config::{HedgeEngineConfig, ParallelConfig, StrategyConfig};
use crate::market::MarketData;
use crate::pricing::PremiumProvider;

/// Parallel execution errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParallelError {
    /// Thread pool could not be built.
    #[error("Thread pool error: {message}")]
    ThreadPoolError {
        /// Error message.
        message: String,
    },

    /// A job failed and the batch was configured to stop.
    #[error("Simulation {job_id} failed: {message}")]
    SimulationFailed {
        /// Failing job.
        job_id: String,
        /// Error message.
        message: String,
    },

    /// No jobs to execute.
    #[error("No jobs to execute")]
    NoJobs,
}

/// Progress tracker shared by worker threads.
#[derive(Debug)]
pub struct ProgressTracker {
    total_jobs: u64,
    completed_jobs: AtomicU64,
    failed_jobs: AtomicU64,
    start_time: Instant,
}

impl ProgressTracker {
    /// Create a tracker for `total_jobs`.
    #[must_use]
    pub fn new(total_jobs: u64) -> Self {
        Self {
            total_jobs,
            completed_jobs: AtomicU64::new(0),
            failed_jobs: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Mark a job as completed.
    pub fn job_completed(&self, success: bool) {
        self.completed_jobs.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_jobs.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current progress.
    #[must_use]
    pub fn progress(&self) -> Progress {
        let completed = self.completed_jobs.load(Ordering::Relaxed);
        let failed = self.failed_jobs.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();

        let jobs_per_sec = if elapsed.as_secs_f64() > 0.0 {
            completed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let remaining = self.total_jobs.saturating_sub(completed);
        let eta_secs = if jobs_per_sec > 0.0 {
            (remaining as f64 / jobs_per_sec) as u64
        } else {
            0
        };

        Progress {
            total: self.total_jobs,
            completed,
            failed,
            elapsed_secs: elapsed.as_secs(),
            eta_secs,
            jobs_per_sec,
        }
    }
}

/// Progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Total number of jobs.
    pub total: u64,
    /// Completed jobs.
    pub completed: u64,
    /// Failed jobs.
    pub failed: u64,
    /// Elapsed time in seconds.
    pub elapsed_secs: u64,
    /// Estimated time remaining in seconds.
    pub eta_secs: u64,
    /// Jobs processed per second.
    pub jobs_per_sec: f64,
}

impl Progress {
    /// Completion percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

/// One simulation to run.
#[derive(Debug, Clone)]
pub struct SimulationJob {
    /// Job ID.
    pub job_id: String,
    /// Shared run settings.
    pub config: Arc<HedgeEngineConfig>,
    /// Strategy for this run.
    pub strategy: StrategyConfig,
}

impl SimulationJob {
    /// One job per configured strategy.
    #[must_use]
    pub fn from_config(config: HedgeEngineConfig) -> Vec<Self> {
        let config = Arc::new(config);
        config
            .strategies
            .iter()
            .enumerate()
            .map(|(i, strategy)| Self {
                job_id: format!("job_{i}_{}", strategy.name),
                config: Arc::clone(&config),
                strategy: strategy.clone(),
            })
            .collect()
    }
}

/// Outcome of one job.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Job ID.
    pub job_id: String,
    /// Run name.
    pub run_name: String,
    /// Result on success.
    pub result: Option<SimulationResult>,
    /// Error message on failure.
    pub error: Option<String>,
    /// Whether the failure was a data gap.
    pub fatal: bool,
    /// Wall-clock time.
    pub execution_time_ms: u64,
    /// Whether the run completed.
    pub success: bool,
}

/// Outcome of a batch.
#[derive(Debug, Clone)]
pub struct ParallelResult {
    /// Per-job results in job order.
    pub results: Vec<JobResult>,
    /// Wall-clock time for the batch.
    pub total_time_ms: u64,
    /// Jobs executed.
    pub jobs_executed: u64,
    /// Jobs that completed.
    pub jobs_succeeded: u64,
    /// Jobs that failed.
    pub jobs_failed: u64,
}

impl ParallelResult {
    /// Fraction of jobs that completed.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.jobs_executed == 0 {
            0.0
        } else {
            self.jobs_succeeded as f64 / self.jobs_executed as f64
        }
    }

    /// Completed simulation results.
    pub fn successful_results(&self) -> impl Iterator<Item = &SimulationResult> {
        self.results.iter().filter_map(|r| r.result.as_ref())
    }
}

/// Runs simulation jobs, in parallel when there are enough of them.
#[derive(Debug, Clone)]
pub struct ParallelRunner {
    config: ParallelConfig,
}

impl ParallelRunner {
    /// Create a runner.
    #[must_use]
    pub const fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    /// Run every job against the shared market data and premium provider.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::NoJobs`] for an empty batch,
    /// [`ParallelError::ThreadPoolError`] if the pool cannot be built, and
    /// [`ParallelError::SimulationFailed`] for the first failed job when
    /// `continue_on_error` is off.
    pub fn run_jobs(
        &self,
        jobs: &[SimulationJob],
        market: &Arc<MarketData>,
        premiums: &Arc<dyn PremiumProvider>,
    ) -> Result<ParallelResult, ParallelError> {
        if jobs.is_empty() {
            return Err(ParallelError::NoJobs);
        }

        let tracker = Arc::new(ProgressTracker::new(jobs.len() as u64));
        let start_time = Instant::now();

        info!(
            "Starting simulation batch: {} jobs, {} threads",
            jobs.len(),
            self.effective_thread_count()
        );

        let results = if jobs.len() >= self.config.min_parallel_jobs {
            self.run_parallel(jobs, market, premiums, &tracker)?
        } else {
            self.run_sequential(jobs, market, premiums, &tracker)?
        };

        let elapsed = start_time.elapsed();
        let final_progress = tracker.progress();

        info!(
            "Simulation batch complete: {}/{} succeeded in {:.2}s ({:.1} jobs/s)",
            final_progress.completed - final_progress.failed,
            final_progress.total,
            elapsed.as_secs_f64(),
            final_progress.jobs_per_sec
        );

        Ok(ParallelResult {
            results,
            total_time_ms: elapsed.as_millis() as u64,
            jobs_executed: final_progress.completed,
            jobs_succeeded: final_progress.completed - final_progress.failed,
            jobs_failed: final_progress.failed,
        })
    }

    fn run_parallel(
        &self,
        jobs: &[SimulationJob],
        market: &Arc<MarketData>,
        premiums: &Arc<dyn PremiumProvider>,
        tracker: &Arc<ProgressTracker>,
    ) -> Result<Vec<JobResult>, ParallelError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("simulation-{i}"));
        if self.config.max_threads > 0 {
            builder = builder.num_threads(self.config.max_threads);
        }
        let pool = builder.build().map_err(|e| ParallelError::ThreadPoolError {
            message: e.to_string(),
        })?;

        pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let result = execute_job(job, market, premiums);
                    tracker.job_completed(result.success);

                    let progress = tracker.progress();
                    debug!(
                        "Progress: {:.1}% ({}/{}) - ETA: {}s",
                        progress.percentage(),
                        progress.completed,
                        progress.total,
                        progress.eta_secs
                    );
                    self.check(result)
                })
                .collect()
        })
    }

    fn run_sequential(
        &self,
        jobs: &[SimulationJob],
        market: &Arc<MarketData>,
        premiums: &Arc<dyn PremiumProvider>,
        tracker: &Arc<ProgressTracker>,
    ) -> Result<Vec<JobResult>, ParallelError> {
        jobs.iter()
            .map(|job| {
                let result = execute_job(job, market, premiums);
                tracker.job_completed(result.success);
                self.check(result)
            })
            .collect()
    }

    fn check(&self, result: JobResult) -> Result<JobResult, ParallelError> {
        if result.success || self.config.continue_on_error {
            return Ok(result);
        }
        Err(ParallelError::SimulationFailed {
            job_id: result.job_id,
            message: result.error.unwrap_or_default(),
        })
    }

    /// Threads the parallel path will use.
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        if self.config.max_threads > 0 {
            self.config.max_threads
        } else {
            rayon::current_num_threads()
        }
    }
}

fn execute_job(
    job: &SimulationJob,
    market: &Arc<MarketData>,
    premiums: &Arc<dyn PremiumProvider>,
) -> JobResult {
    let _span = span!(Level::DEBUG, "simulation_job", job_id = %job.job_id).entered();
    let start = Instant::now();

    let mut engine = SimulationEngine::from_config(
        &job.config,
        &job.strategy,
        Arc::clone(market),
        Arc::clone(premiums),
    );
    let simulation = &job.config.simulation;
    let outcome = engine.run_market_dates(simulation.start_date, simulation.end_date);
    let execution_time_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(result) => JobResult {
            job_id: job.job_id.clone(),
            run_name: job.strategy.name.clone(),
            result: Some(result),
            error: None,
            fatal: false,
            execution_time_ms,
            success: true,
        },
        Err(e) => {
            let fatal = matches!(e, SimulationError::DataGap { .. });
            error!(job_id = %job.job_id, fatal, error = %e, "Simulation failed");
            JobResult {
                job_id: job.job_id.clone(),
                run_name: job.strategy.name.clone(),
                result: None,
                error: Some(e.to_string()),
                fatal,
                execution_time_ms,
                success: false,
            }
        }
    }
}
