// 8.2 engine/trading.rs: trade commands, manual price impacts, watchlist edits.
// rejections return before anything is touched, so a failed call leaves no trace.

use super::core::Simulation;
use super::results::EngineError;
use crate::events::{EventPayload, ImpactEvent, Severity, TradeEvent, WatchlistEvent};
use crate::market;
use crate::portfolio::{Fill, Side};
use crate::risk::{RiskState, RiskTrigger};
use crate::types::{Leverage, Price, Symbol};
use rust_decimal::Decimal;

impl Simulation {
    pub fn buy(&mut self, symbol: &Symbol, quantity: u64, leverage: Leverage) -> Result<Fill, EngineError> {
        self.ensure_trading()?;
        self.market_index(symbol)?;

        let prices = self.prices();
        let fill = self
            .portfolio
            .buy(symbol, quantity, leverage, self.profile.max_leverage, &prices)?;

        tracing::info!(
            symbol = %symbol,
            quantity,
            price = %fill.price,
            leverage = %leverage,
            borrowed = %fill.debt_change,
            "buy filled"
        );
        self.record_fill(&fill);
        Ok(fill)
    }

    /// Sales during a margin call may cure it.
    pub fn sell(&mut self, symbol: &Symbol, quantity: u64) -> Result<Fill, EngineError> {
        self.ensure_trading()?;
        self.market_index(symbol)?;

        let prices = self.prices();
        let fill = self.portfolio.sell(symbol, quantity, &prices)?;

        tracing::info!(
            symbol = %symbol,
            quantity,
            price = %fill.price,
            repaid = %fill.debt_change,
            "sell filled"
        );
        self.record_fill(&fill);

        if self.risk.state() == RiskState::MarginCall {
            self.evaluate_risk(RiskTrigger::SaleExecuted);
        }
        Ok(fill)
    }

    /// Pushes a price by `pct` percent, as a news shock would. Risk is not
    /// re-evaluated until the next tick.
    pub fn apply_impact(&mut self, symbol: &Symbol, pct: Decimal) -> Result<Price, EngineError> {
        let state = self.risk.state();
        if state.is_terminal() {
            return Err(EngineError::SessionHalted(state));
        }
        let index = self.market_index(symbol)?;

        let old_price = self.markets[index].current_price;
        self.markets[index] = market::apply_impact(&self.markets[index], pct);
        let new_price = self.markets[index].current_price;

        tracing::info!(symbol = %symbol, pct = %pct, old = %old_price, new = %new_price, "impact applied");
        self.emit_event(EventPayload::ImpactApplied(ImpactEvent {
            symbol: symbol.clone(),
            impact_pct: pct,
            old_price,
            new_price,
        }));
        Ok(new_price)
    }

    /// Adds `symbol` to the end of the watchlist. `Ok(false)` if already watched.
    pub fn watch(&mut self, symbol: &Symbol) -> Result<bool, EngineError> {
        self.market_index(symbol)?;
        if self.watchlist.contains(symbol) {
            return Ok(false);
        }
        self.watchlist.push(symbol.clone());
        self.refresh_watchlist();
        self.emit_event(EventPayload::WatchlistChanged(WatchlistEvent {
            symbol: symbol.clone(),
            added: true,
        }));
        Ok(true)
    }

    pub fn unwatch(&mut self, symbol: &Symbol) -> bool {
        let before = self.watchlist.len();
        self.watchlist.retain(|s| s != symbol);
        if self.watchlist.len() == before {
            return false;
        }
        self.refresh_watchlist();
        self.emit_event(EventPayload::WatchlistChanged(WatchlistEvent {
            symbol: symbol.clone(),
            added: false,
        }));
        true
    }

    fn ensure_trading(&self) -> Result<(), EngineError> {
        let state = self.risk.state();
        if state.allows_trading() {
            Ok(())
        } else {
            tracing::debug!(state = %state, "trade rejected");
            Err(EngineError::TradeRejectedState(state))
        }
    }

    fn record_fill(&mut self, fill: &Fill) {
        let name = self.display_name(&fill.symbol);
        let text = match fill.side {
            Side::Buy if fill.used_margin() => format!(
                "Bought {} x {} @ {} (borrowed {})",
                fill.quantity, name, fill.price, fill.debt_change
            ),
            Side::Buy => format!("Bought {} x {} @ {}", fill.quantity, name, fill.price),
            Side::Sell => format!("Sold {} x {} @ {}", fill.quantity, name, fill.price),
        };
        self.notify(text, Severity::Info, false);
        self.emit_event(EventPayload::Trade(TradeEvent::from(fill)));
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Difficulty, SimulationConfig};
    use crate::engine::{EngineError, Simulation};
    use crate::events::Severity;
    use crate::instrument::Instrument;
    use crate::portfolio::LedgerError;
    use crate::types::{Leverage, Symbol};
    use rust_decimal_macros::dec;

    fn session(difficulty: Difficulty) -> Simulation {
        let instruments = vec![
            Instrument::new("AAPL", "Apple Inc.", dec!(180), dec!(0.8)),
            Instrument::new("TSLA", "Tesla Inc.", dec!(250), dec!(2.5)),
        ];
        Simulation::new(SimulationConfig::scripted(difficulty, instruments)).unwrap()
    }

    fn lev(x: u32) -> Leverage {
        Leverage::from_int(x).unwrap()
    }

    #[test]
    fn margin_buy_notifies_borrowed_amount() {
        let mut sim = session(Difficulty::Normal);
        sim.buy(&Symbol::from("AAPL"), 16_000, lev(3)).unwrap();

        let note = sim.notifications().next().unwrap();
        assert_eq!(note.severity, Severity::Info);
        assert!(note.text.contains("Apple Inc."));
        assert!(note.text.contains("borrowed 1880000"));
    }

    #[test]
    fn rejection_leaves_no_trace() {
        let mut sim = session(Difficulty::Normal);
        let events_before = sim.events().len();

        let err = sim.buy(&Symbol::from("AAPL"), 1, lev(5)).unwrap_err();
        assert!(matches!(err, EngineError::Ledger(LedgerError::LeverageExceeded { .. })));

        assert_eq!(sim.events().len(), events_before);
        assert!(sim.notifications().next().is_none());
        assert!(!sim.portfolio().has_positions());
    }

    #[test]
    fn unknown_symbol_rejected() {
        let mut sim = session(Difficulty::Normal);
        let ghost = Symbol::from("GHOST");
        assert!(matches!(
            sim.buy(&ghost, 1, lev(1)),
            Err(EngineError::UnknownInstrument(_))
        ));
        assert!(matches!(sim.sell(&ghost, 1), Err(EngineError::UnknownInstrument(_))));
        assert!(matches!(
            sim.apply_impact(&ghost, dec!(5)),
            Err(EngineError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn trades_allowed_while_stopped() {
        let mut sim = session(Difficulty::Safe);
        assert!(!sim.is_running());
        let fill = sim.buy(&Symbol::from("TSLA"), 10, lev(1)).unwrap();
        assert_eq!(fill.notional.value(), dec!(2500));
    }

    #[test]
    fn impact_moves_price_only() {
        let mut sim = session(Difficulty::Normal);
        let aapl = Symbol::from("AAPL");
        let price = sim.apply_impact(&aapl, dec!(-16)).unwrap();

        assert_eq!(price.value(), dec!(151.2));
        let market = sim.market(&aapl).unwrap();
        assert_eq!(market.low.value(), dec!(180));
    }

    #[test]
    fn watchlist_edits() {
        let mut sim = session(Difficulty::Normal);
        let aapl = Symbol::from("AAPL");

        assert!(!sim.watch(&aapl).unwrap());
        assert!(sim.unwatch(&aapl));
        assert!(!sim.unwatch(&aapl));
        assert_eq!(sim.watchlist().len(), 1);

        assert!(sim.watch(&aapl).unwrap());
        let order: Vec<&str> = sim.watchlist().iter().map(|w| w.symbol.as_str()).collect();
        assert_eq!(order, vec!["TSLA", "AAPL"]);

        assert!(matches!(
            sim.watch(&Symbol::from("GHOST")),
            Err(EngineError::UnknownInstrument(_))
        ));
    }
}
