//! Per-instrument market state and the price engine transitions.
//!
//! [`MarketState`] is a plain value. The price engine is three functions
//! ([`tick`], [`apply_impact`], [`reset`]) that take a state and return the
//! next one, with randomness passed in explicitly. Nothing here knows about
//! clocks or portfolios.

use crate::book::OrderBook;
use crate::instrument::Instrument;
use crate::types::{Price, Symbol, Timestamp};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const MIN_TICK_VOLUME: u64 = 100;
pub const MAX_TICK_VOLUME: u64 = 1100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    /// Sliding window of price points kept for charting.
    pub history_len: usize,
    /// Levels per side of the synthetic book.
    pub book_depth: usize,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            history_len: 60,
            book_depth: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub symbol: Symbol,
    pub current_price: Price,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub volume: u64,
    /// Oldest first, at most `history_len` points.
    pub price_history: VecDeque<PricePoint>,
    pub order_book: OrderBook,
}

impl MarketState {
    pub fn new<R: Rng + ?Sized>(instrument: &Instrument, params: &MarketParams, rng: &mut R) -> Self {
        let base = instrument.base_price;
        Self {
            symbol: instrument.symbol.clone(),
            current_price: base,
            open: base,
            high: base,
            low: base,
            volume: 0,
            price_history: VecDeque::with_capacity(params.history_len),
            order_book: OrderBook::generate(base, params.book_depth, rng),
        }
    }

    pub fn percent_change_since_open(&self) -> Decimal {
        percent_change(self.open, self.current_price)
    }

    pub fn last_point(&self) -> Option<&PricePoint> {
        self.price_history.back()
    }
}

/// What one tick produced, as shown in the instrument header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub symbol: Symbol,
    pub timestamp: Timestamp,
    pub price: Price,
    /// The random move drawn for this tick, in percent.
    pub tick_change_pct: Decimal,
    pub percent_change_since_open: Decimal,
    pub volume: u64,
    pub high: Price,
    pub low: Price,
    pub open: Price,
}

pub fn percent_change(from: Price, to: Price) -> Decimal {
    (to.value() - from.value()) / from.value() * dec!(100)
}

/// Draws a move uniformly from `[-volatility/2, +volatility/2]` percent.
pub fn draw_change_pct<R: Rng + ?Sized>(volatility: Decimal, rng: &mut R) -> Decimal {
    let u = Decimal::from_f64(rng.gen::<f64>()).unwrap_or(dec!(0.5));
    (u - dec!(0.5)) * volatility
}

/// One step of the random walk.
pub fn tick<R: Rng + ?Sized>(
    state: &MarketState,
    instrument: &Instrument,
    params: &MarketParams,
    rng: &mut R,
    now: Timestamp,
) -> (MarketState, TickSnapshot) {
    let change_pct = draw_change_pct(instrument.volatility, rng);
    let price = state.current_price.scaled_by_pct(change_pct);

    let mut price_history = state.price_history.clone();
    price_history.push_back(PricePoint { timestamp: now, price });
    while price_history.len() > params.history_len {
        price_history.pop_front();
    }

    let next = MarketState {
        symbol: state.symbol.clone(),
        current_price: price,
        open: state.open,
        high: state.high.max(price),
        low: state.low.min(price),
        volume: state.volume + rng.gen_range(MIN_TICK_VOLUME..MAX_TICK_VOLUME),
        price_history,
        order_book: OrderBook::generate(price, params.book_depth, rng),
    };

    let snapshot = TickSnapshot {
        symbol: next.symbol.clone(),
        timestamp: now,
        price,
        tick_change_pct: change_pct,
        percent_change_since_open: next.percent_change_since_open(),
        volume: next.volume,
        high: next.high,
        low: next.low,
        open: next.open,
    };

    (next, snapshot)
}

/// News shock. Only the price moves; the next tick reconciles high/low/history.
pub fn apply_impact(state: &MarketState, pct: Decimal) -> MarketState {
    MarketState {
        current_price: state.current_price.scaled_by_pct(pct),
        ..state.clone()
    }
}

pub fn reset<R: Rng + ?Sized>(instrument: &Instrument, params: &MarketParams, rng: &mut R) -> MarketState {
    MarketState::new(instrument, params, rng)
}
