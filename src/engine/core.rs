// 8.0 engine/core.rs: the session. owns markets, ledger, risk state, timers, logs.

use super::results::{EngineError, InstrumentQuote, Snapshot, WatchlistEntry};
use crate::config::{DifficultyProfile, SimulationConfig};
use crate::events::{Event, EventId, EventPayload, Notification, NotificationLog, Severity};
use crate::instrument::{self, Instrument};
use crate::margin::Valuation;
use crate::market::MarketState;
use crate::news::{NewsGenerator, NewsLog};
use crate::portfolio::Portfolio;
use crate::risk::{RiskMonitor, RiskState};
use crate::scheduler::Scheduler;
use crate::types::{Price, PriceMap, Symbol, Timestamp};
use rand::rngs::StdRng;
use rand::SeedableRng;

/** 8.1: one trading session. all state lives here */
#[derive(Debug)]
pub struct Simulation {
    pub(super) config: SimulationConfig,
    pub(super) profile: DifficultyProfile,
    pub(super) instruments: Vec<Instrument>,
    /// Same order as `instruments`.
    pub(super) markets: Vec<MarketState>,
    pub(super) watchlist: Vec<Symbol>,
    pub(super) watch_entries: Vec<WatchlistEntry>,
    pub(super) portfolio: Portfolio,
    pub(super) risk: RiskMonitor,
    pub(super) news: NewsGenerator,
    pub(super) news_log: NewsLog,
    pub(super) notifications: NotificationLog,
    pub(super) scheduler: Scheduler,
    pub(super) rng: StdRng,
    pub(super) running: bool,
    pub(super) current_time: Timestamp,
    pub(super) tick_count: u64,
    pub(super) margin_call_deadline: Option<Timestamp>,
    pub(super) paused_grace_ms: Option<i64>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let params = &config.limits.market;
        let markets = config
            .instruments
            .iter()
            .map(|inst| MarketState::new(inst, params, &mut rng))
            .collect();

        let mut sim = Self {
            profile: config.profile(),
            instruments: config.instruments.clone(),
            markets,
            watchlist: config.watchlist.clone(),
            watch_entries: Vec::new(),
            portfolio: Portfolio::new(config.initial_cash),
            risk: RiskMonitor::new(),
            news: NewsGenerator::new(config.news_catalog.clone(), config.clock.news_delay),
            news_log: NewsLog::new(config.limits.news_log_capacity),
            notifications: NotificationLog::new(config.limits.notification_capacity),
            scheduler: Scheduler::new(),
            rng,
            running: false,
            current_time: Timestamp::from_millis(0),
            tick_count: 0,
            margin_call_deadline: None,
            paused_grace_ms: None,
            events: Vec::new(),
            next_event_id: 1,
            config,
        };
        sim.refresh_watchlist();

        tracing::info!(
            difficulty = ?sim.profile.difficulty,
            instruments = sim.instruments.len(),
            initial_cash = %sim.portfolio.initial_cash,
            "session created"
        );
        Ok(sim)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn risk_state(&self) -> RiskState {
        self.risk.state()
    }

    pub fn margin_call_deadline(&self) -> Option<Timestamp> {
        self.margin_call_deadline
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn market(&self, symbol: &Symbol) -> Option<&MarketState> {
        self.markets.iter().find(|m| &m.symbol == symbol)
    }

    pub fn price(&self, symbol: &Symbol) -> Option<Price> {
        self.market(symbol).map(|m| m.current_price)
    }

    pub fn prices(&self) -> PriceMap {
        self.markets
            .iter()
            .map(|m| (m.symbol.clone(), m.current_price))
            .collect()
    }

    pub fn valuation(&self) -> Valuation {
        self.portfolio.valuation(&self.prices())
    }

    pub fn watchlist(&self) -> &[WatchlistEntry] {
        &self.watch_entries
    }

    pub fn news_log(&self) -> &NewsLog {
        &self.news_log
    }

    /// Newest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn snapshot(&self) -> Snapshot {
        let instruments = self
            .instruments
            .iter()
            .zip(&self.markets)
            .map(|(inst, m)| InstrumentQuote {
                symbol: m.symbol.clone(),
                display_name: inst.display_name.clone(),
                price: m.current_price,
                percent_change_since_open: m.percent_change_since_open(),
            })
            .collect();

        Snapshot {
            timestamp: self.current_time,
            running: self.running,
            tick: self.tick_count,
            profile: self.profile.clone(),
            instruments,
            watchlist: self.watch_entries.clone(),
            holdings: self.portfolio.holdings.clone(),
            valuation: self.valuation(),
            risk_state: self.risk.state(),
            margin_call_deadline: self.margin_call_deadline,
            paused_grace_ms: self.paused_grace_ms,
            news: self.news_log.to_vec(),
            notifications: self.notifications.to_vec(),
        }
    }

    pub(super) fn market_index(&self, symbol: &Symbol) -> Result<usize, EngineError> {
        self.markets
            .iter()
            .position(|m| &m.symbol == symbol)
            .ok_or_else(|| EngineError::UnknownInstrument(symbol.clone()))
    }

    pub(super) fn display_name(&self, symbol: &Symbol) -> String {
        instrument::find(&self.instruments, symbol)
            .map(|i| i.display_name.clone())
            .unwrap_or_else(|| symbol.to_string())
    }

    pub(super) fn refresh_watchlist(&mut self) {
        self.watch_entries = self
            .watchlist
            .iter()
            .filter_map(|symbol| self.markets.iter().find(|m| &m.symbol == symbol))
            .map(|m| WatchlistEntry {
                symbol: m.symbol.clone(),
                price: m.current_price,
                percent_change_since_open: m.percent_change_since_open(),
            })
            .collect();
    }

    pub(super) fn notify(&mut self, text: impl Into<String>, severity: Severity, alert: bool) {
        self.notifications.push(text, severity, self.current_time, alert);
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        tracing::trace!(id = event.id.0, payload = ?event.payload, "event");

        self.events.push(event);

        if self.events.len() > self.config.limits.max_events {
            let drain_count = self.events.len() - self.config.limits.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
