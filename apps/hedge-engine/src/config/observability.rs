//! Log output settings read by [`crate::logging::init_tracing`].

use serde::{Deserialize, Serialize};

use super::parallel::default_true;

/// Wrapper kept so the YAML reads `observability.logging`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Subscriber settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Subscriber output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Subscriber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for the `hedge_engine` target when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Attach the current span and span list to JSON lines.
    #[serde(default = "default_true")]
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Json,
            include_spans: true,
        }
    }
}

fn default_level() -> String {
    "info".into()
}
