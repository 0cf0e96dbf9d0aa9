//! Exercise when remaining time value is small relative to intrinsic.

use super::ExerciseRule;
use super::context::ExerciseContext;

/// Fires when `time_value < threshold × intrinsic` on an in-the-money put.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRule {
    threshold: f64,
}

impl ThresholdRule {
    /// Create a rule with the given threshold (0.02 = 2% of intrinsic).
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self::new(0.02)
    }
}

impl ExerciseRule for ThresholdRule {
    fn should_exercise(&self, context: &ExerciseContext) -> bool {
        let intrinsic = context.intrinsic();
        if intrinsic <= 0.0 {
            return false;
        }
        context.time_value < self.threshold * intrinsic
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}
