//! Structured simulation events and tracing setup.
//!
//! Every simulation run carries a `simulation_id` (UUID v4). The engine
//! records a [`HedgeEvent`] for each settlement and each attempted rehedge
//! and mirrors it to `tracing`.
//!
//! # Log Levels
//!
//! - **INFO**: run start/end, settlements, purchases, zero hedges
//! - **WARN**: infeasible solves, refused purchases, forward-filled dates
//! - **DEBUG**: skipped rehedges and solver detail

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ObservabilityConfig};
use crate::strategy::RehedgeOutcome;

// ============================================
// Event Types
// ============================================

/// Simulation event for structured logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum HedgeEvent {
    /// Simulation started.
    SimulationStart(SimulationStartEvent),
    /// Simulation ended.
    SimulationEnd(SimulationEndEvent),
    /// Strategy invoked.
    Rehedge(RehedgeEvent),
    /// Contracts settled.
    Settlement(SettlementEvent),
}

/// Simulation start event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStartEvent {
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
    /// Initial portfolio value.
    pub initial_value: Decimal,
}

/// Simulation end event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEndEvent {
    /// Simulation ID.
    pub simulation_id: String,
    /// Run name.
    pub run_name: String,
    /// Last simulated date.
    pub end_date: NaiveDate,
    /// Final portfolio value.
    pub final_value: Decimal,
    /// Dates processed.
    pub trading_days: u64,
    /// Rehedges attempted.
    pub rehedges: u64,
    /// Contracts exercised early.
    pub exercises: u64,
    /// Quotes served by the fallback estimator.
    pub fallback_quotes: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Rehedge event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RehedgeEvent {
    /// Simulation ID.
    pub simulation_id: String,
    /// Date of the rehedge.
    pub date: NaiveDate,
    /// Strategy variant.
    pub strategy: String,
    /// What happened.
    pub outcome: RehedgeOutcome,
    /// Quotes served by the fallback estimator.
    pub fallback_quotes: usize,
}

/// Settlement event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementEvent {
    /// Simulation ID.
    pub simulation_id: String,
    /// Settlement date.
    pub date: NaiveDate,
    /// Contracts exercised early.
    pub exercised: usize,
    /// Contracts settled at expiry.
    pub expired: usize,
    /// Cash credited.
    pub payoff_total: Decimal,
}

// ============================================
// Logging Functions
// ============================================

/// Log simulation start.
pub fn log_simulation_start(event: &SimulationStartEvent) {
    info!(
        simulation_id = %event.simulation_id,
        run_name = %event.run_name,
        strategy = %event.strategy,
        exercise_rule = %event.exercise_rule,
        start_date = %event.start_date,
        initial_value = %event.initial_value,
        "Simulation started"
    );
}

/// Log simulation end.
pub fn log_simulation_end(event: &SimulationEndEvent) {
    info!(
        simulation_id = %event.simulation_id,
        run_name = %event.run_name,
        end_date = %event.end_date,
        final_value = %event.final_value,
        trading_days = event.trading_days,
        rehedges = event.rehedges,
        exercises = event.exercises,
        fallback_quotes = event.fallback_quotes,
        duration_ms = event.duration_ms,
        "Simulation completed"
    );
}

/// Log a rehedge at a level matching its outcome.
pub fn log_rehedge(event: &RehedgeEvent) {
    match &event.outcome {
        RehedgeOutcome::Purchased {
            contracts,
            units,
            premium_paid,
            sized_down,
        } => info!(
            simulation_id = %event.simulation_id,
            date = %event.date,
            strategy = %event.strategy,
            contracts = contracts.len(),
            units,
            premium_paid = %premium_paid,
            sized_down,
            fallback_quotes = event.fallback_quotes,
            "Protection purchased"
        ),
        RehedgeOutcome::NoProtectionNeeded => info!(
            simulation_id = %event.simulation_id,
            date = %event.date,
            strategy = %event.strategy,
            "Zero hedge: no protection purchased"
        ),
        RehedgeOutcome::NoHedgeAvailable { reason } => warn!(
            simulation_id = %event.simulation_id,
            date = %event.date,
            strategy = %event.strategy,
            reason = %reason,
            "No hedge available this period"
        ),
        RehedgeOutcome::InsufficientCash {
            required,
            available,
        } => warn!(
            simulation_id = %event.simulation_id,
            date = %event.date,
            strategy = %event.strategy,
            required = %required,
            available = %available,
            "Purchase refused: insufficient cash"
        ),
        RehedgeOutcome::Skipped { reason } => debug!(
            simulation_id = %event.simulation_id,
            date = %event.date,
            strategy = %event.strategy,
            reason = %reason,
            "Rehedge skipped"
        ),
    }
}

/// Log a settlement.
pub fn log_settlement(event: &SettlementEvent) {
    info!(
        simulation_id = %event.simulation_id,
        date = %event.date,
        exercised = event.exercised,
        expired = event.expired,
        payoff_total = %event.payoff_total,
        "Contracts settled"
    );
}

// ============================================
// Event Log
// ============================================

/// In-memory event log for one simulation.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<HedgeEvent>,
    log_to_tracing: bool,
}

impl EventLog {
    /// Create a log that also emits to `tracing`.
    #[must_use]
    pub const fn new(log_to_tracing: bool) -> Self {
        Self {
            events: Vec::new(),
            log_to_tracing,
        }
    }

    /// Record an event.
    pub fn log(&mut self, event: HedgeEvent) {
        if self.log_to_tracing {
            match &event {
                HedgeEvent::SimulationStart(e) => log_simulation_start(e),
                HedgeEvent::SimulationEnd(e) => log_simulation_end(e),
                HedgeEvent::Rehedge(e) => log_rehedge(e),
                HedgeEvent::Settlement(e) => log_settlement(e),
            }
        }
        self.events.push(event);
    }

    /// Recorded events.
    #[must_use]
    pub fn events(&self) -> &[HedgeEvent] {
        &self.events
    }

    /// Take the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<HedgeEvent> {
        self.events
    }

    /// Events as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }
}

// ============================================
// Subscriber Setup
// ============================================

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `hedge_engine=<level>` from config.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let logging = &config.logging;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hedge_engine={}", logging.level)));

    let installed = if logging.format == LogFormat::Pretty {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(logging.include_spans)
            .with_span_list(logging.include_spans)
            .try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
