// trade-dojo-core: leveraged trading simulator core.
// risk-first: revaluation and the margin state machine run on every tick.
// all computation is deterministic for a seed, on a logical clock, no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Symbol, Price, Money, Leverage, Timestamp
//   2.x  instrument.rs: instrument definitions + default catalog
//   2.1  book.rs: synthetic order book levels
//   2.2  market.rs: per-instrument state, tick / impact / reset transitions
//   3.x  news.rs: news catalog, two-stage generator, bounded news log
//   4.x  margin.rs: valuation, margin ratio, buying power
//   5.x  portfolio.rs: cash / holdings / debt ledger, forced liquidation
//   6.x  risk.rs: margin call, loss cut, bankruptcy state machine
//   7.x  config.rs: difficulty profiles, session config, validation
//   8.x  engine/: session: clock, trading, risk handling, snapshots
//   8.9  scheduler.rs: logical-time task queue
//   9.x  events.rs: audit events, user notifications
//   logging.rs: tracing subscriber setup

// market simulation
pub mod book;
pub mod instrument;
pub mod market;
pub mod news;
pub mod types;

// ledger and risk
pub mod margin;
pub mod portfolio;
pub mod risk;

// session
pub mod config;
pub mod engine;
pub mod events;
pub mod logging;
pub mod scheduler;

// re exports for convenience
pub use book::{BookLevel, OrderBook};
pub use config::{ClockConfig, ConfigError, Difficulty, DifficultyProfile, LimitsConfig, SimulationConfig};
pub use engine::*;
pub use events::*;
pub use instrument::Instrument;
pub use margin::Valuation;
pub use market::{MarketParams, MarketState, PricePoint, TickSnapshot};
pub use news::{NewsCategory, NewsDelay, NewsEventDef, NewsGenerator, NewsLog, NewsOccurrence, NewsSeverity};
pub use portfolio::{Fill, LedgerError, Liquidation, Portfolio, Side};
pub use risk::{LiquidationReason, RiskEvent, RiskMonitor, RiskState, RiskTrigger, Transition};
pub use types::*;
