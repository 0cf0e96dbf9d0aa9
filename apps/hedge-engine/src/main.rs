//! Hedge Engine Binary
//!
//! Runs every configured strategy over the market history and writes one
//! valuation CSV and one JSON summary per run.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hedge-engine -- config.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `HEDGE_ENGINE_CONFIG`: config path when no argument is given
//!   (default: config.yaml)
//! - `RUST_LOG`: log filter (default: `hedge_engine=<logging.level>`)

use std::sync::Arc;

use anyhow::Context;
use hedge_engine::config::{HedgeEngineConfig, load_config, resolve_config_path};
use hedge_engine::logging::init_tracing;
use hedge_engine::market::load_market_csv;
use hedge_engine::pricing::{
    FallbackPremiumProvider, HistoricalQuoteStore, ParametricPremiumEstimator, PremiumProvider,
};
use hedge_engine::simulation::{ParallelRunner, SimulationJob, write_run_outputs};
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path(std::env::args().nth(1));
    let config = load_config(Some(&config_path))
        .with_context(|| format!("failed to load config from {config_path}"))?;

    init_tracing(&config.observability)?;
    info!(config = %config_path, strategies = config.strategies.len(), "Hedge engine starting");

    let market = load_market_csv(&config.data.market_csv)
        .with_context(|| format!("failed to load market data from {}", config.data.market_csv))?;
    let market = Arc::new(market);
    let premiums = build_premium_provider(&config)?;

    let runner = ParallelRunner::new(config.parallel.clone());
    let output_dir = config.data.output_dir.clone();
    let jobs = SimulationJob::from_config(config);
    let batch = runner.run_jobs(&jobs, &market, &premiums)?;

    for job in &batch.results {
        match (&job.result, &job.error) {
            (Some(result), _) => {
                write_run_outputs(&output_dir, result)
                    .with_context(|| format!("failed to write outputs for {}", job.run_name))?;
                info!(
                    run_name = %result.run_name,
                    final_value = %result.final_value,
                    total_return = result.metrics.total_return,
                    max_drawdown = result.metrics.max_drawdown,
                    rehedges = result.counters.rehedges,
                    zero_hedges = result.counters.zero_hedges,
                    infeasible = result.counters.infeasible_solves,
                    fallback_quotes = result.counters.fallback_quotes,
                    "Run complete"
                );
            }
            (None, Some(message)) => {
                error!(run_name = %job.run_name, fatal = job.fatal, error = %message, "Run failed");
            }
            (None, None) => warn!(run_name = %job.run_name, "Run produced no result"),
        }
    }

    if batch.jobs_failed > 0 {
        anyhow::bail!("{} of {} runs failed", batch.jobs_failed, batch.jobs_executed);
    }
    Ok(())
}

fn build_premium_provider(config: &HedgeEngineConfig) -> anyhow::Result<Arc<dyn PremiumProvider>> {
    let estimator = ParametricPremiumEstimator::new(config.pricing.default_volatility_proxy);
    let Some(quotes_csv) = &config.data.quotes_csv else {
        info!("No quote store configured; using parametric premiums");
        return Ok(Arc::new(FallbackPremiumProvider::parametric_only(estimator)));
    };

    let store = HistoricalQuoteStore::load_csv(
        quotes_csv,
        config.pricing.strike_tolerance,
        config.pricing.expiry_tolerance_days,
    )
    .with_context(|| format!("failed to load option quotes from {quotes_csv}"))?;
    Ok(Arc::new(FallbackPremiumProvider::new(Arc::new(store), estimator)))
}
