//! LP solver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::optimizer::SolverSettings;

/// Optimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Wall-clock budget per LP solve in milliseconds (0 disables the limit).
    #[serde(default = "default_solve_timeout_ms")]
    pub solve_timeout_ms: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            solve_timeout_ms: default_solve_timeout_ms(),
        }
    }
}

impl OptimizerConfig {
    /// Solver settings for this configuration.
    #[must_use]
    pub const fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            time_budget: if self.solve_timeout_ms == 0 {
                None
            } else {
                Some(Duration::from_millis(self.solve_timeout_ms))
            },
        }
    }
}

const fn default_solve_timeout_ms() -> u64 {
    5000
}
