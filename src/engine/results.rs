// 8.0.2: read models and errors for engine operations.

use crate::config::{ConfigError, DifficultyProfile};
use crate::events::Notification;
use crate::margin::Valuation;
use crate::news::NewsOccurrence;
use crate::portfolio::LedgerError;
use crate::risk::RiskState;
use crate::types::{Price, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// One watchlist row, captured on every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistEntry {
    pub symbol: Symbol,
    pub price: Price,
    pub percent_change_since_open: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentQuote {
    pub symbol: Symbol,
    pub display_name: String,
    pub price: Price,
    pub percent_change_since_open: Decimal,
}

/// Everything the presentation layer renders from.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub running: bool,
    pub tick: u64,
    pub profile: DifficultyProfile,
    pub instruments: Vec<InstrumentQuote>,
    pub watchlist: Vec<WatchlistEntry>,
    pub holdings: BTreeMap<Symbol, u64>,
    pub valuation: Valuation,
    pub risk_state: RiskState,
    /// Set only while a margin call countdown is live.
    pub margin_call_deadline: Option<Timestamp>,
    /// Grace held over from a margin call paused by `stop()`.
    pub paused_grace_ms: Option<i64>,
    pub news: Vec<NewsOccurrence>,
    pub notifications: Vec<Notification>,
}

impl Snapshot {
    pub fn price(&self, symbol: &Symbol) -> Option<Price> {
        self.instruments.iter().find(|q| &q.symbol == symbol).map(|q| q.price)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Trading is disabled while the account is {0}")]
    TradeRejectedState(RiskState),

    #[error("Unknown instrument {0}")]
    UnknownInstrument(Symbol),

    #[error("Session is {0}; reset before continuing")]
    SessionHalted(RiskState),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
