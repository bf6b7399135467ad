//! Session lifecycle and the logical clock.
//!
//! Three timers share the queue: the fixed tick, the jittered news round and
//! the one-shot margin-call countdown. `advance_time` runs whatever falls due
//! in order, stamping the session clock with each task's due time.

use super::core::Simulation;
use super::results::EngineError;
use crate::events::{EventPayload, ImpactEvent, Severity, StoppedEvent, TickEvent};
use crate::market;
use crate::risk::RiskTrigger;
use crate::scheduler::Task;

impl Simulation {
    /// Arms the tick and news timers. Calling it while running does nothing.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let state = self.risk.state();
        if !state.allows_trading() {
            return Err(EngineError::SessionHalted(state));
        }
        if self.running {
            return Ok(());
        }

        self.running = true;
        let now = self.current_time;
        self.scheduler
            .schedule(now.plus_millis(self.config.clock.tick_interval_ms), Task::Tick);

        if let Some(remaining) = self.paused_grace_ms.take() {
            let deadline = now.plus_millis(remaining);
            self.margin_call_deadline = Some(deadline);
            self.scheduler.schedule(deadline, Task::MarginCallExpiry);
            tracing::info!(remaining_ms = remaining, "margin call countdown resumed");
        }

        tracing::info!(at = %now.clock_label(), "simulation started");
        self.emit_event(EventPayload::Started);

        // first news round happens right away, then reschedules itself
        self.run_news();
        Ok(())
    }

    /// Cancels the tick and news timers. A live margin-call countdown is
    /// paused and picks up where it left off on the next `start()`.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.scheduler.cancel(Task::Tick);
        self.scheduler.cancel(Task::News);

        if let Some(deadline) = self.margin_call_deadline.take() {
            self.scheduler.cancel(Task::MarginCallExpiry);
            self.paused_grace_ms = Some(self.current_time.millis_until(deadline).max(0));
        }

        tracing::info!(grace_remaining_ms = ?self.paused_grace_ms, "simulation stopped");
        self.emit_event(EventPayload::Stopped(StoppedEvent {
            grace_remaining_ms: self.paused_grace_ms,
        }));
    }

    /// Back to the configured starting point. The logical clock keeps running forward.
    pub fn reset(&mut self) {
        self.running = false;
        self.scheduler.clear();
        self.margin_call_deadline = None;
        self.paused_grace_ms = None;
        self.tick_count = 0;

        let params = &self.config.limits.market;
        self.markets = self
            .instruments
            .iter()
            .map(|inst| market::reset(inst, params, &mut self.rng))
            .collect();

        self.portfolio.reset();
        self.risk.reset();
        self.news_log.clear();
        self.notifications.clear();
        self.watchlist = self.config.watchlist.clone();
        self.refresh_watchlist();

        tracing::info!("session reset");
        self.emit_event(EventPayload::Reset);
    }

    /// Moves the clock forward by `millis`, running every task that falls due.
    pub fn advance_time(&mut self, millis: i64) {
        let target = self.current_time.plus_millis(millis.max(0));

        while let Some((due, task)) = self.scheduler.pop_due(target) {
            self.current_time = due.max(self.current_time);
            match task {
                Task::Tick => self.run_tick(),
                Task::News => self.run_news(),
                Task::MarginCallExpiry => self.run_grace_expiry(),
            }
        }

        self.current_time = target;
    }

    /// Advances by `count` tick intervals.
    pub fn run_ticks(&mut self, count: u64) {
        let span = self.config.clock.tick_interval_ms.saturating_mul(count as i64);
        self.advance_time(span);
    }

    /// Prices first, then the watchlist, then valuation and risk.
    fn run_tick(&mut self) {
        let now = self.current_time;
        self.tick_count += 1;

        let params = &self.config.limits.market;
        for (state, inst) in self.markets.iter_mut().zip(&self.instruments) {
            let (next, snap) = market::tick(state, inst, params, &mut self.rng, now);
            tracing::debug!(symbol = %snap.symbol, price = %snap.price, change = %snap.tick_change_pct, "tick");
            *state = next;
        }

        self.refresh_watchlist();

        let valuation = self.valuation();
        self.emit_event(EventPayload::Tick(TickEvent {
            tick: self.tick_count,
            prices: self
                .markets
                .iter()
                .map(|m| (m.symbol.clone(), m.current_price))
                .collect(),
            equity: valuation.equity,
            margin_ratio: valuation.margin_ratio,
        }));

        self.evaluate_risk(RiskTrigger::Revaluation);

        if self.running {
            self.scheduler
                .schedule(now.plus_millis(self.config.clock.tick_interval_ms), Task::Tick);
        }
    }

    /// One news round. Reschedules whether or not anything fired.
    pub(super) fn run_news(&mut self) {
        let now = self.current_time;

        if let Some(occurrence) = self.news.evaluate(&self.instruments, &mut self.rng, now) {
            let symbol = occurrence.target_symbol.clone();
            if let Ok(index) = self.market_index(&symbol) {
                let old_price = self.markets[index].current_price;
                self.markets[index] = market::apply_impact(&self.markets[index], occurrence.impact);
                let new_price = self.markets[index].current_price;

                if occurrence.is_critical() {
                    tracing::warn!(symbol = %symbol, impact = %occurrence.impact, "critical news");
                    let sign = if occurrence.is_positive() { "+" } else { "" };
                    self.notify(
                        format!("Breaking: {} ({sign}{}%)", occurrence.rendered_text, occurrence.impact),
                        Severity::Warning,
                        true,
                    );
                } else {
                    tracing::debug!(symbol = %symbol, impact = %occurrence.impact, "news");
                }

                self.emit_event(EventPayload::ImpactApplied(ImpactEvent {
                    symbol,
                    impact_pct: occurrence.impact,
                    old_price,
                    new_price,
                }));
                self.news_log.push(occurrence.clone());
                self.emit_event(EventPayload::NewsPublished(occurrence));
            }
        }

        if self.running {
            let delay = self.news.next_delay_ms(&mut self.rng);
            self.scheduler.schedule(now.plus_millis(delay), Task::News);
        }
    }

    fn run_grace_expiry(&mut self) {
        self.margin_call_deadline = None;
        tracing::warn!("margin call grace period expired");
        self.evaluate_risk(RiskTrigger::GraceExpired);
    }
}
