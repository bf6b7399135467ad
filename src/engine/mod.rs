// 8.0: session engine. owns the clock and coordinates price ticks, news rounds,
// trades and risk checks. deterministic for a given seed, no external I/O.

mod clock;
mod core;
mod results;
mod risk;
mod trading;

pub use core::Simulation;
pub use results::{EngineError, InstrumentQuote, Snapshot, WatchlistEntry};
