//! Parallel run configuration.

use serde::{Deserialize, Serialize};

/// Configuration for running independent simulations in parallel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Maximum worker threads (0 = one per core).
    #[serde(default)]
    pub max_threads: usize,
    /// Below this many jobs runs are sequential.
    #[serde(default = "default_min_parallel_jobs")]
    pub min_parallel_jobs: usize,
    /// Keep running remaining jobs after one fails.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            min_parallel_jobs: default_min_parallel_jobs(),
            continue_on_error: true,
        }
    }
}

impl ParallelConfig {
    /// Sequential execution, for tests and debugging.
    #[must_use]
    pub const fn sequential() -> Self {
        Self {
            max_threads: 1,
            min_parallel_jobs: usize::MAX,
            continue_on_error: true,
        }
    }
}

const fn default_min_parallel_jobs() -> usize {
    2
}

pub(crate) const fn default_true() -> bool {
    true
}
