//! Single-portfolio simulation loop.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{Level, debug, span, warn};
use uuid::Uuid;

use super::metrics::PerformanceMetrics;
use super::types::{
    SimulationCounters, SimulationError, SimulationResult, SimulationState, ValuationPoint,
};
use crate::config::{HedgeEngineConfig, TimeValueModel};
use crate::exercise::{ExerciseContext, ExerciseRule, build_rule};
use crate::ledger::{ContractId, Portfolio, SettlementReport};
use crate::logging::{
    EventLog, HedgeEvent, RehedgeEvent, SettlementEvent, SimulationEndEvent, SimulationStartEvent,
};
use crate::market::{MarketData, MarketDataError, MissingDataPolicy};
use crate::optimizer::SolverSettings;
use crate::pricing::{PremiumProvider, PremiumRequest};
use crate::strategy::{
    HedgeStrategy, RehedgeOutcome, RehedgeResult, StrategyContext, TradingParams,
};

/// Engine parameters fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Contract sizing and costs.
    pub trading: TradingParams,
    /// LP solver settings.
    pub solver: SolverSettings,
    /// Gap policy for simulated dates.
    pub missing_data: MissingDataPolicy,
    /// Risk-free rate for exercise rules.
    pub risk_free_rate: f64,
    /// Time value source for exercise rules.
    pub time_value_model: TimeValueModel,
}

impl EngineSettings {
    /// Settings from a loaded configuration.
    #[must_use]
    pub const fn from_config(config: &HedgeEngineConfig) -> Self {
        Self {
            trading: TradingParams {
                contract_multiplier: config.simulation.contract_multiplier,
                option_transaction_cost: config.simulation.option_transaction_cost,
            },
            solver: config.optimizer.solver_settings(),
            missing_data: config.simulation.missing_data,
            risk_free_rate: config.pricing.risk_free_rate,
            time_value_model: config.exercise.time_value_model,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LastObservation {
    date: NaiveDate,
    spot: Decimal,
    volatility_proxy: f64,
}

/// Drives one portfolio and one strategy through a date sequence.
pub struct SimulationEngine {
    simulation_id: String,
    run_name: String,
    market: Arc<MarketData>,
    premiums: Arc<dyn PremiumProvider>,
    strategy: Box<dyn HedgeStrategy>,
    exercise: Box<dyn ExerciseRule>,
    settings: EngineSettings,
    portfolio: Portfolio,
    initial_value: Decimal,
    state: SimulationState,
    started_at: Option<Instant>,
    start_date: Option<NaiveDate>,
    last: Option<LastObservation>,
    last_rehedge: Option<NaiveDate>,
    valuations: Vec<ValuationPoint>,
    counters: SimulationCounters,
    log: EventLog,
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("simulation_id", &self.simulation_id)
            .field("run_name", &self.run_name)
            .field("strategy", &self.strategy.name())
            .field("exercise", &self.exercise.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Build an engine from explicit parts.
    #[must_use]
    pub fn new(
        run_name: impl Into<String>,
        portfolio: Portfolio,
        strategy: Box<dyn HedgeStrategy>,
        exercise: Box<dyn ExerciseRule>,
        market: Arc<MarketData>,
        premiums: Arc<dyn PremiumProvider>,
        settings: EngineSettings,
    ) -> Self {
        let initial_value = portfolio.equity_value() + portfolio.cash();
        Self {
            simulation_id: Uuid::new_v4().to_string(),
            run_name: run_name.into(),
            market,
            premiums,
            strategy,
            exercise,
            settings,
            portfolio,
            initial_value,
            state: SimulationState::Initialized,
            started_at: None,
            start_date: None,
            last: None,
            last_rehedge: None,
            valuations: Vec::new(),
            counters: SimulationCounters::default(),
            log: EventLog::new(true),
        }
    }

    /// Build an engine for one configured strategy.
    #[must_use]
    pub fn from_config(
        config: &HedgeEngineConfig,
        strategy: &crate::config::StrategyConfig,
        market: Arc<MarketData>,
        premiums: Arc<dyn PremiumProvider>,
    ) -> Self {
        let portfolio = Portfolio::new(
            config.simulation.initial_value,
            config.simulation.initial_cash,
            config.simulation.portfolio_settings(),
        );
        Self::new(
            strategy.name.clone(),
            portfolio,
            crate::strategy::build_strategy(&strategy.strategy),
            build_rule(&config.exercise),
            market,
            premiums,
            EngineSettings::from_config(config),
        )
    }

    /// Simulation ID.
    #[must_use]
    pub fn simulation_id(&self) -> &str {
        &self.simulation_id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SimulationState {
        self.state
    }

    /// The portfolio being simulated.
    #[must_use]
    pub const fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Valuations recorded so far.
    #[must_use]
    pub fn valuations(&self) -> &[ValuationPoint] {
        &self.valuations
    }

    /// Counters so far.
    #[must_use]
    pub const fn counters(&self) -> &SimulationCounters {
        &self.counters
    }

    /// Market dates inside an optional `[start, end]` window.
    #[must_use]
    pub fn market_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<NaiveDate> {
        self.market
            .dates()
            .filter(|d| start.is_none_or(|s| *d >= s) && end.is_none_or(|e| *d <= e))
            .collect()
    }

    /// Run every market date inside the window and complete.
    ///
    /// # Errors
    ///
    /// See [`Self::run`].
    pub fn run_market_dates(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<SimulationResult, SimulationError> {
        let dates = self.market_dates(start, end);
        self.run(&dates)
    }

    /// Run every date and complete.
    ///
    /// # Errors
    ///
    /// Fails if the engine is not freshly initialized, the sequence is empty
    /// or not strictly increasing, a date has no market data, or the
    /// strategy fails. Sequence problems are detected before any state
    /// changes.
    pub fn run(&mut self, dates: &[NaiveDate]) -> Result<SimulationResult, SimulationError> {
        if self.state != SimulationState::Initialized {
            return Err(SimulationError::InvalidState(format!(
                "run requires INITIALIZED, engine is {}",
                self.state
            )));
        }
        if dates.is_empty() {
            return Err(SimulationError::InvalidState(
                "empty date sequence".to_string(),
            ));
        }
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(SimulationError::InvalidDateSequence {
                previous: pair[0],
                next: pair[1],
            });
        }

        let _span = span!(Level::INFO, "simulation", simulation_id = %self.simulation_id).entered();
        for date in dates {
            self.step(*date)?;
        }
        self.finish()
    }

    /// Process one date.
    ///
    /// # Errors
    ///
    /// Fails after completion, on a non-increasing date, on a data gap, or
    /// when the strategy fails.
    pub fn step(&mut self, date: NaiveDate) -> Result<ValuationPoint, SimulationError> {
        match self.state {
            SimulationState::Completed => {
                return Err(SimulationError::InvalidState(
                    "simulation already completed".to_string(),
                ));
            }
            SimulationState::Initialized => self.begin(date),
            SimulationState::Running => {}
        }
        if let Some(previous) = self.last.map(|l| l.date).filter(|d| date <= *d) {
            return Err(SimulationError::InvalidDateSequence {
                previous,
                next: date,
            });
        }

        let resolved = self
            .market
            .resolve(date, self.settings.missing_data)
            .map_err(|e| match e {
                MarketDataError::DataGap { date, details } => {
                    SimulationError::DataGap { date, details }
                }
                other => SimulationError::DataGap {
                    date,
                    details: other.to_string(),
                },
            })?;
        if resolved.forward_filled {
            warn!(date = %date, "Market data forward-filled");
            self.counters.forward_filled_dates += 1;
        }
        let snapshot = resolved.snapshot;
        let spot = snapshot.spot;

        // 1. Mark equity.
        if let Some(last_spot) = self.last.map(|l| l.spot).filter(|s| !s.is_zero()) {
            self.portfolio.apply_index_return(spot / last_spot - Decimal::ONE);
        }

        // 2. Settle.
        let exercised = self.flag_exercises(date, spot, snapshot.volatility_proxy);
        let report = self
            .portfolio
            .settle_expired_and_exercised(spot, date, &exercised);
        self.record_settlement(date, &report);

        // 3. Rehedge.
        if self.rehedge_due(date) {
            let history = self.market.history_through(date);
            let context = StrategyContext {
                date,
                snapshot,
                history,
                premiums: self.premiums.as_ref(),
                trading: self.settings.trading,
                solver: self.settings.solver,
            };
            let result = self
                .strategy
                .rehedge(&mut self.portfolio, &context)
                .map_err(|source| SimulationError::Strategy {
                    strategy: self.strategy.name().to_string(),
                    date,
                    source,
                })?;
            self.last_rehedge = Some(date);
            self.record_rehedge(date, result);
        }

        // 4. Record.
        let option_value = self.portfolio.mark_value(spot, date);
        let point = ValuationPoint {
            date,
            total_value: self.portfolio.equity_value() + self.portfolio.cash() + option_value,
            spot,
            equity_value: self.portfolio.equity_value(),
            cash: self.portfolio.cash(),
            option_value,
        };
        self.valuations.push(point);
        self.counters.trading_days += 1;
        self.last = Some(LastObservation {
            date,
            spot,
            volatility_proxy: snapshot.volatility_proxy,
        });
        Ok(point)
    }

    /// Complete the run and build its result.
    ///
    /// # Errors
    ///
    /// Fails unless the engine is running.
    pub fn finish(&mut self) -> Result<SimulationResult, SimulationError> {
        if self.state != SimulationState::Running {
            return Err(SimulationError::InvalidState(format!(
                "finish requires RUNNING, engine is {}",
                self.state
            )));
        }
        let (Some(start_date), Some(last)) = (self.start_date, self.last) else {
            return Err(SimulationError::InvalidState(
                "no dates were processed".to_string(),
            ));
        };
        self.state = SimulationState::Completed;

        let totals = self.portfolio.totals();
        self.counters.premiums_paid = totals.premiums_paid;
        self.counters.payoffs_realized = totals.payoffs_realized;

        let final_value = self
            .valuations
            .last()
            .map_or(self.initial_value, |p| p.total_value);
        let duration_ms = self
            .started_at
            .map_or(0, |t| u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX));

        self.log.log(HedgeEvent::SimulationEnd(SimulationEndEvent {
            simulation_id: self.simulation_id.clone(),
            run_name: self.run_name.clone(),
            end_date: last.date,
            final_value,
            trading_days: self.counters.trading_days,
            rehedges: self.counters.rehedges,
            exercises: self.counters.exercises,
            fallback_quotes: self.counters.fallback_quotes,
            duration_ms,
        }));

        let values: Vec<f64> = self
            .valuations
            .iter()
            .map(|p| p.total_value.to_f64().unwrap_or(0.0))
            .collect();
        let benchmark: Vec<f64> = self
            .valuations
            .iter()
            .map(|p| p.spot.to_f64().unwrap_or(0.0))
            .collect();
        let years = (last.date - start_date).num_days() as f64 / 365.25;

        Ok(SimulationResult {
            simulation_id: self.simulation_id.clone(),
            run_name: self.run_name.clone(),
            strategy: self.strategy.name().to_string(),
            exercise_rule: self.exercise.name().to_string(),
            start_date,
            end_date: last.date,
            initial_value: self.initial_value,
            final_value,
            valuations: self.valuations.clone(),
            counters: self.counters,
            metrics: PerformanceMetrics::compute(&values, &benchmark, years),
            events: std::mem::take(&mut self.log).into_events(),
            duration_ms,
        })
    }

    fn begin(&mut self, date: NaiveDate) {
        self.state = SimulationState::Running;
        self.started_at = Some(Instant::now());
        self.start_date = Some(date);
        self.log.log(HedgeEvent::SimulationStart(SimulationStartEvent {
            simulation_id: self.simulation_id.clone(),
            run_name: self.run_name.clone(),
            strategy: self.strategy.name().to_string(),
            exercise_rule: self.exercise.name().to_string(),
            start_date: date,
            initial_value: self.initial_value,
        }));
    }

    fn rehedge_due(&self, date: NaiveDate) -> bool {
        match (self.strategy.rehedge_interval_days(), self.last_rehedge) {
            (None, _) | (Some(_), None) => true,
            (Some(interval), Some(last)) => (date - last).num_days() >= i64::from(interval),
        }
    }

    fn flag_exercises(
        &self,
        date: NaiveDate,
        spot: Decimal,
        volatility_proxy: f64,
    ) -> HashSet<ContractId> {
        let spot_f = spot.to_f64().unwrap_or(0.0);
        let previous = self.last.map(|l| l.volatility_proxy);

        self.portfolio
            .active_contracts(date)
            .filter(|contract| {
                let strike = contract.strike.to_f64().unwrap_or(0.0);
                let time_value = match self.settings.time_value_model {
                    TimeValueModel::IntrinsicOnly => 0.0,
                    TimeValueModel::PremiumProvider => {
                        let quote = self.premiums.get_premium(&PremiumRequest {
                            strike,
                            spot: spot_f,
                            valuation_date: date,
                            expiry_date: contract.expiry,
                            volatility_proxy,
                        });
                        quote.split(strike, spot_f).1
                    }
                };
                let context = ExerciseContext {
                    spot: spot_f,
                    strike,
                    days_to_expiry: contract.days_to_expiry(date),
                    volatility_proxy,
                    volatility_proxy_previous: previous,
                    risk_free_rate: self.settings.risk_free_rate,
                    time_value,
                };
                let fire = self.exercise.should_exercise(&context);
                if fire {
                    debug!(
                        contract_id = %contract.id,
                        rule = self.exercise.name(),
                        moneyness = context.moneyness(),
                        days_to_expiry = context.days_to_expiry,
                        "Exercise rule fired"
                    );
                }
                fire
            })
            .map(|contract| contract.id)
            .collect()
    }

    fn record_settlement(&mut self, date: NaiveDate, report: &SettlementReport) {
        if report.is_empty() {
            return;
        }
        let exercised = report.exercised_count();
        let expired = report.expired_count();
        self.counters.exercises += exercised as u64;
        self.counters.expiries += expired as u64;
        self.log.log(HedgeEvent::Settlement(SettlementEvent {
            simulation_id: self.simulation_id.clone(),
            date,
            exercised,
            expired,
            payoff_total: report.payoff_total,
        }));
    }

    fn record_rehedge(&mut self, date: NaiveDate, result: RehedgeResult) {
        self.counters.fallback_quotes += result.fallback_quotes as u64;
        match &result.outcome {
            RehedgeOutcome::Purchased { sized_down, .. } => {
                self.counters.purchases += 1;
                if *sized_down {
                    self.counters.sized_down_purchases += 1;
                }
            }
            RehedgeOutcome::NoProtectionNeeded => self.counters.zero_hedges += 1,
            RehedgeOutcome::NoHedgeAvailable { .. } => self.counters.infeasible_solves += 1,
            RehedgeOutcome::InsufficientCash { .. } => self.counters.cash_refusals += 1,
            RehedgeOutcome::Skipped { reason } => {
                self.counters.skipped_rehedges += 1;
                debug!(date = %date, reason = %reason, "Rehedge skipped");
                return;
            }
        }
        self.counters.rehedges += 1;
        self.log.log(HedgeEvent::Rehedge(RehedgeEvent {
            simulation_id: self.simulation_id.clone(),
            date,
            strategy: self.strategy.name().to_string(),
            outcome: result.outcome,
            fallback_quotes: result.fallback_quotes,
        }));
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::exercise::NeverExercise;
    use crate::ledger::PortfolioSettings;
    use crate::market::MarketSnapshot;
    use crate::pricing::{FallbackPremiumProvider, ParametricPremiumEstimator};
    use crate::strategy::{QuarterlyParams, QuarterlyStrategy};

    fn day(offset: i64) -> NaiveDate {
        let Some(start) = NaiveDate::from_ymd_opt(2020, 1, 1) else {
            panic!("valid date");
        };
        start + chrono::Duration::days(offset)
    }

    fn market(spots: &[f64]) -> Arc<MarketData> {
        let rows = spots
            .iter()
            .enumerate()
            .map(|(i, s)| {
                MarketSnapshot::new(day(i as i64), Decimal::from_f64(*s).unwrap_or(Decimal::ONE), 20.0)
            })
            .collect();
        match MarketData::new(rows) {
            Ok(m) => Arc::new(m),
            Err(e) => panic!("market: {e}"),
        }
    }

    fn engine(spots: &[f64]) -> SimulationEngine {
        let settings = EngineSettings {
            trading: TradingParams::default(),
            solver: SolverSettings::default(),
            missing_data: MissingDataPolicy::Error,
            risk_free_rate: 0.045,
            time_value_model: TimeValueModel::IntrinsicOnly,
        };
        SimulationEngine::new(
            "test",
            Portfolio::new(dec!(1_000_000), Decimal::ZERO, PortfolioSettings::default()),
            Box::new(QuarterlyStrategy::new(QuarterlyParams {
                rehedge_interval_days: 5,
                strike_ratio: 0.95,
                expiry_days: 5,
            })),
            Box::new(NeverExercise),
            market(spots),
            Arc::new(FallbackPremiumProvider::parametric_only(
                ParametricPremiumEstimator::default(),
            )),
            settings,
        )
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = engine(&[4500.0, 4510.0, 4490.0]);
        assert_eq!(engine.state(), SimulationState::Initialized);

        if let Err(e) = engine.step(day(0)) {
            panic!("step failed: {e}");
        }
        assert_eq!(engine.state(), SimulationState::Running);

        let Ok(result) = engine.finish() else {
            panic!("finish failed");
        };
        assert_eq!(engine.state(), SimulationState::Completed);
        assert_eq!(result.valuations.len(), 1);

        assert!(matches!(engine.step(day(1)), Err(SimulationError::InvalidState(_))));
    }

    #[test]
    fn test_finish_before_start_is_invalid() {
        let mut engine = engine(&[4500.0]);
        assert!(matches!(engine.finish(), Err(SimulationError::InvalidState(_))));
    }

    #[test]
    fn test_rejects_non_increasing_dates() {
        let mut engine = engine(&[4500.0, 4510.0, 4490.0]);
        let result = engine.run(&[day(0), day(2), day(1)]);
        assert!(matches!(result, Err(SimulationError::InvalidDateSequence { .. })));
        assert_eq!(engine.state(), SimulationState::Initialized);
    }

    #[test]
    fn test_missing_date_is_data_gap() {
        let mut engine = engine(&[4500.0, 4510.0]);
        let result = engine.run(&[day(0), day(1), day(10)]);
        let Err(err) = result else {
            panic!("expected data gap");
        };
        assert!(matches!(err, SimulationError::DataGap { .. }));
    }

    #[test]
    fn test_expiry_settles_payoff_on_expiry_date() {
        // Buy on day 0 at strike 4275 expiring day 5; index falls to 4000.
        let spots = [4500.0, 4400.0, 4300.0, 4200.0, 4100.0, 4000.0];
        let mut engine = engine(&spots);
        let dates: Vec<NaiveDate> = (0..6).map(day).collect();

        let result = match engine.run(&dates) {
            Ok(r) => r,
            Err(e) => panic!("run failed: {e}"),
        };

        assert_eq!(result.counters.purchases, 2);
        assert_eq!(result.counters.expiries, 1);
        // 2 contracts × 100 units × (4275 − 4000).
        assert_eq!(result.counters.payoffs_realized, dec!(55_000));
        assert_eq!(result.valuations.len(), 6);
        assert!(result.events.iter().any(|e| matches!(e, HedgeEvent::Settlement(_))));
    }

    #[test]
    fn test_run_twice_is_invalid() {
        let mut engine = engine(&[4500.0, 4510.0]);
        if let Err(e) = engine.run(&[day(0), day(1)]) {
            panic!("first run failed: {e}");
        }
        assert!(matches!(
            engine.run(&[day(0), day(1)]),
            Err(SimulationError::InvalidState(_))
        ));
    }
}
