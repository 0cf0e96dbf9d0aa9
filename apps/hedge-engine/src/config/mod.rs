//! Configuration for hedge simulations.
//!
//! Provides YAML loading, validation, and environment variable
//! interpolation. One immutable [`HedgeEngineConfig`] describes a batch of
//! runs; each simulation job receives its own clone.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hedge_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("configs/backtest.yaml"))?;
//!
//! println!("strategies: {}", config.strategies.len());
//! ```

mod data;
mod exercise;
mod observability;
mod optimizer;
mod parallel;
mod pricing;
mod simulation;
mod strategies;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use data::DataConfig;
pub use exercise::{ExerciseConfig, ExercisePolicy, TimeValueModel};
pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use optimizer::OptimizerConfig;
pub use parallel::ParallelConfig;
pub use pricing::PricingConfig;
pub use simulation::SimulationConfig;
pub use strategies::{StrategyConfig, StrategyKind, default_strategies};

use crate::ledger::FundingPolicy;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "HEDGE_ENGINE_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeEngineConfig {
    /// Portfolio and run window.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Premium providers.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Early-exercise rule.
    #[serde(default)]
    pub exercise: ExerciseConfig,
    /// LP solver.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Strategies to simulate, one run each.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyConfig>,
    /// Input and output paths.
    #[serde(default)]
    pub data: DataConfig,
    /// Parallel runs.
    #[serde(default)]
    pub parallel: ParallelConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for HedgeEngineConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            pricing: PricingConfig::default(),
            exercise: ExerciseConfig::default(),
            optimizer: OptimizerConfig::default(),
            strategies: default_strategies(),
            data: DataConfig::default(),
            parallel: ParallelConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Resolve the config path: explicit argument, then
/// [`CONFIG_PATH_ENV`], then `config.yaml`.
#[must_use]
pub fn resolve_config_path(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var(CONFIG_PATH_ENV).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "config.yaml".to_string())
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<HedgeEngineConfig, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if a referenced environment variable is unset
/// without a default, or if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<HedgeEngineConfig, ConfigError> {
    let interpolated = interpolate_env_vars(yaml)?;
    let config: HedgeEngineConfig = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. A variable that is
/// unset or empty takes its default; one with no default must be set.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match (std::env::var(var_name), default_value) {
            (Ok(v), _) if !v.is_empty() => v,
            (_, Some(default)) => default.to_string(),
            (Ok(v), None) => v,
            (Err(_), None) => return Err(ConfigError::MissingEnvVar(var_name.to_string())),
        };

        result = result.replace(full_match, &value);
    }

    Ok(result)
}

fn fraction_in(value: f64, lo: f64, hi: f64, name: &str) -> Result<(), ConfigError> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{name} must be between {lo} and {hi}"
        )))
    }
}

/// Validate configuration values.
pub fn validate_config(config: &HedgeEngineConfig) -> Result<(), ConfigError> {
    let sim = &config.simulation;
    if sim.initial_value.is_sign_negative() || sim.initial_value.is_zero() {
        return Err(ConfigError::ValidationError(
            "simulation.initial_value must be positive".to_string(),
        ));
    }
    if sim.initial_cash.is_sign_negative() {
        return Err(ConfigError::ValidationError(
            "simulation.initial_cash must not be negative".to_string(),
        ));
    }
    if !sim.beta.is_finite() || sim.beta < 0.0 {
        return Err(ConfigError::ValidationError(
            "simulation.beta must be non-negative".to_string(),
        ));
    }
    if sim.contract_multiplier == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.contract_multiplier must be positive".to_string(),
        ));
    }
    fraction_in(sim.option_transaction_cost, 0.0, 1.0, "simulation.option_transaction_cost")?;
    fraction_in(sim.equity_transaction_cost, 0.0, 0.5, "simulation.equity_transaction_cost")?;
    if let FundingPolicy::LiquidateEquity { buffer } = sim.funding_policy {
        fraction_in(buffer, 0.0, 1.0, "simulation.funding_policy.buffer")?;
    }
    if matches!((sim.start_date, sim.end_date), (Some(start), Some(end)) if start > end) {
        return Err(ConfigError::ValidationError(
            "simulation.start_date must not be after end_date".to_string(),
        ));
    }

    fraction_in(config.pricing.strike_tolerance, 0.0, 1.0, "pricing.strike_tolerance")?;
    if config.pricing.expiry_tolerance_days < 0 {
        return Err(ConfigError::ValidationError(
            "pricing.expiry_tolerance_days must not be negative".to_string(),
        ));
    }
    if !config.pricing.default_volatility_proxy.is_finite()
        || config.pricing.default_volatility_proxy <= 0.0
    {
        return Err(ConfigError::ValidationError(
            "pricing.default_volatility_proxy must be positive".to_string(),
        ));
    }
    fraction_in(config.pricing.risk_free_rate, 0.0, 1.0, "risk_free_rate")?;

    fraction_in(config.exercise.threshold, 0.0, 1.0, "exercise.threshold")?;
    fraction_in(config.exercise.moneyness_trigger, 0.0, 1.0, "exercise.moneyness_trigger")?;
    fraction_in(config.exercise.volatility_drop, 0.0, 1.0, "exercise.volatility_drop")?;
    if config.exercise.max_days_to_expiry < 0 {
        return Err(ConfigError::ValidationError(
            "exercise.max_days_to_expiry must not be negative".to_string(),
        ));
    }

    if config.strategies.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one strategy must be configured".to_string(),
        ));
    }
    let mut names = HashSet::new();
    for strategy in &config.strategies {
        if strategy.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "strategy names must not be empty".to_string(),
            ));
        }
        if !names.insert(strategy.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate strategy name '{}'",
                strategy.name
            )));
        }
        crate::strategy::validate_params(&strategy.strategy)
            .map_err(|e| ConfigError::ValidationError(format!("strategy '{}': {e}", strategy.name)))?;
    }

    if config.parallel.min_parallel_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "parallel.min_parallel_jobs must be at least 1".to_string(),
        ));
    }

    if config.observability.logging.level.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "observability.logging.level must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::market::MissingDataPolicy;
    use crate::optimizer::ScenarioCalibration;

    #[test]
    fn test_default_config() {
        let config = HedgeEngineConfig::default();

        assert_eq!(config.simulation.initial_value, dec!(1_000_000));
        assert_eq!(config.simulation.contract_multiplier, 100);
        assert!((config.pricing.strike_tolerance - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.pricing.expiry_tolerance_days, 7);
        assert_eq!(config.exercise.policy, ExercisePolicy::Hybrid);
        assert_eq!(config.optimizer.solve_timeout_ms, 5000);
        assert_eq!(config.strategies.len(), 4);
        assert_eq!(config.simulation.missing_data, MissingDataPolicy::Error);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_empty_config_uses_defaults() {
        let config = match load_config_from_string("{}") {
            Ok(c) => c,
            Err(e) => panic!("should load empty config: {e}"),
        };
        assert_eq!(config.strategies.len(), 4);
        assert!((config.pricing.risk_free_rate - 0.045).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r"
simulation:
  initial_value: 500000
  beta: 1.2
  funding_policy:
    mode: reject
  missing_data: forward_fill
exercise:
  policy: optimal_boundary
  time_value_model: premium_provider
optimizer:
  solve_timeout_ms: 0
strategies:
  - name: floor_calibrated
    strategy:
      type: scenario_floor_lp
      max_loss: 0.15
      calibration:
        mode: volatility_scaled
        z: 1.65
  - name: q
    strategy:
      type: quarterly
data:
  market_csv: data/spx.csv
  quotes_csv: data/quotes.csv
observability:
  logging:
    format: pretty
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load config: {e}"),
        };
        assert_eq!(config.simulation.initial_value, dec!(500000));
        assert_eq!(config.simulation.funding_policy, FundingPolicy::Reject);
        assert_eq!(config.simulation.missing_data, MissingDataPolicy::ForwardFill);
        assert_eq!(config.exercise.policy, ExercisePolicy::OptimalBoundary);
        assert_eq!(config.exercise.time_value_model, TimeValueModel::PremiumProvider);
        assert_eq!(config.optimizer.solver_settings().time_budget, None);
        assert_eq!(config.data.quotes_csv.as_deref(), Some("data/quotes.csv"));

        let StrategyKind::ScenarioFloorLp(params) = &config.strategies[0].strategy else {
            panic!("expected scenario floor strategy");
        };
        assert!((params.max_loss - 0.15).abs() < f64::EPSILON);
        assert_eq!(
            params.calibration,
            ScenarioCalibration::VolatilityScaled {
                z: 1.65,
                horizon_days: 90,
                lookback_days: 252
            }
        );
        assert!(matches!(config.strategies[1].strategy, StrategyKind::Quarterly(_)));
        assert_eq!(config.observability.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let path = dir.path().join("config.yaml");
        if let Err(e) = std::fs::write(&path, "simulation:\n  beta: 0.8\n") {
            panic!("write config: {e}");
        }
        let Some(path_str) = path.to_str() else {
            panic!("utf-8 path");
        };
        let config = match load_config(Some(path_str)) {
            Ok(c) => c,
            Err(e) => panic!("should load config file: {e}"),
        };
        assert!((config.simulation.beta - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = load_config(Some("/nonexistent/hedge-engine.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "format: ${HEDGE_ENGINE_TEST_NONEXISTENT_VAR:-pretty}";
        let result = interpolate_env_vars(input);
        assert_eq!(result.ok().as_deref(), Some("format: pretty"));
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let Ok(result) = interpolate_env_vars(input) else {
            panic!("PATH should be set");
        };
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_must_be_set() {
        let input = "quotes_csv: ${HEDGE_ENGINE_TEST_UNLIKELY_TO_EXIST}";
        let result = interpolate_env_vars(input);
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvVar(ref name)) if name == "HEDGE_ENGINE_TEST_UNLIKELY_TO_EXIST"
        ));
    }

    #[test]
    fn test_missing_env_var_fails_config_load() {
        let yaml = "data:\n  market_csv: ${HEDGE_ENGINE_TEST_UNSET_MARKET_CSV}\n";
        let result = load_config_from_string(yaml);
        let Err(err) = result else {
            panic!("unset variable without default should fail");
        };
        assert!(err.to_string().contains("HEDGE_ENGINE_TEST_UNSET_MARKET_CSV"));
    }

    #[test]
    fn test_validation_duplicate_strategy_names() {
        let yaml = r"
strategies:
  - name: a
    strategy:
      type: quarterly
  - name: a
    strategy:
      type: conditional
";
        let result = load_config_from_string(yaml);
        let Err(err) = result else {
            panic!("expected error for duplicate names");
        };
        assert!(err.to_string().contains("duplicate strategy name"));
    }

    #[test]
    fn test_validation_invalid_risk_free_rate() {
        let yaml = r"
pricing:
  risk_free_rate: 1.5
";
        let result = load_config_from_string(yaml);
        let Err(err) = result else {
            panic!("expected error for invalid risk_free_rate");
        };
        assert!(err.to_string().contains("risk_free_rate"));
    }

    #[test]
    fn test_unknown_log_format_is_parse_error() {
        let yaml = r"
observability:
  logging:
    format: xml
";
        let result = load_config_from_string(yaml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation_empty_log_level() {
        let yaml = r#"
observability:
  logging:
    level: ""
"#;
        let result = load_config_from_string(yaml);
        let Err(err) = result else {
            panic!("expected error for empty level");
        };
        assert!(err.to_string().contains("observability.logging.level"));
    }

    #[test]
    fn test_validation_rejects_bad_strategy_params() {
        let yaml = r"
strategies:
  - name: floor
    strategy:
      type: scenario_floor_lp
      max_loss: 1.5
";
        let result = load_config_from_string(yaml);
        let Err(err) = result else {
            panic!("expected error for max_loss");
        };
        assert!(err.to_string().contains("strategy 'floor'"));
    }

    #[test]
    fn test_resolve_config_path_prefers_argument() {
        assert_eq!(resolve_config_path(Some("a.yaml".to_string())), "a.yaml");
    }
}
