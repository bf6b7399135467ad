// 9.0: every state change produces an event. the audit log is what tests and
// replay tooling read; notifications are the short user-facing subset.
// the EventPayload enum lists all event types.

use crate::news::NewsOccurrence;
use crate::portfolio::{Fill, Side};
use crate::risk::{LiquidationReason, RiskState};
use crate::types::{Money, Price, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Lifecycle
    Started,
    Stopped(StoppedEvent),
    Reset,

    // Market data
    Tick(TickEvent),
    NewsPublished(NewsOccurrence),
    ImpactApplied(ImpactEvent),

    // Trading
    Trade(TradeEvent),
    WatchlistChanged(WatchlistEvent),

    // Risk
    MarginCall(MarginCallEvent),
    MarginCallCured(MarginCallCuredEvent),
    Liquidation(LiquidationEvent),
    Bankruptcy(BankruptcyEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoppedEvent {
    /// Grace left on a paused margin call, if one was running.
    pub grace_remaining_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickEvent {
    pub tick: u64,
    pub prices: Vec<(Symbol, Price)>,
    pub equity: Money,
    pub margin_ratio: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactEvent {
    pub symbol: Symbol,
    pub impact_pct: Decimal,
    pub old_price: Price,
    pub new_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub side: Side,
    pub symbol: Symbol,
    pub quantity: u64,
    pub price: Price,
    pub notional: Money,
    pub cash_change: Money,
    pub debt_change: Money,
}

impl From<&Fill> for TradeEvent {
    fn from(fill: &Fill) -> Self {
        Self {
            side: fill.side,
            symbol: fill.symbol.clone(),
            quantity: fill.quantity,
            price: fill.price,
            notional: fill.notional,
            cash_change: fill.cash_change,
            debt_change: fill.debt_change,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEvent {
    pub symbol: Symbol,
    pub added: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginCallEvent {
    pub margin_ratio: Decimal,
    pub equity: Money,
    pub borrowed: Money,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginCallCuredEvent {
    pub margin_ratio: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub reason: LiquidationReason,
    pub positions_closed: usize,
    pub proceeds: Money,
    pub debt_repaid: Money,
    pub final_equity: Money,
    pub previous_state: RiskState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankruptcyEvent {
    pub equity: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// User-facing message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub text: String,
    pub severity: Severity,
    pub timestamp: Timestamp,
    /// Should be played as an audible alert.
    pub alert: bool,
}

/// Newest-first, bounded.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    capacity: usize,
    next_id: u64,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, severity: Severity, timestamp: Timestamp, alert: bool) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_front(Notification {
            id,
            text: text.into(),
            severity,
            timestamp,
            alert,
        });
        self.entries.truncate(self.capacity);
        id
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
