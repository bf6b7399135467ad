//! Synthetic order book.
//!
//! The book is decoration: it is regenerated from scratch around the current
//! price on every tick and never matched against. Level `i` sits `i` ticks of
//! 0.1 away from the price, asks above and bids below, each with a random
//! integer size in `[100, 1100)`.

use crate::types::Price;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const LEVEL_STEP: Decimal = dec!(0.1);
pub const MIN_LEVEL_SIZE: u64 = 100;
pub const MAX_LEVEL_SIZE: u64 = 1100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderBook {
    /// Highest first.
    pub bids: Vec<BookLevel>,
    /// Lowest first.
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    pub fn generate<R: Rng + ?Sized>(price: Price, depth: usize, rng: &mut R) -> Self {
        let asks = (0..depth)
            .map(|i| BookLevel {
                price: Price::from_raw(price.value() + LEVEL_STEP * Decimal::from(i)),
                size: rng.gen_range(MIN_LEVEL_SIZE..MAX_LEVEL_SIZE),
            })
            .collect();
        // deep bids on penny stocks pile up at the price floor
        let bids = (0..depth)
            .map(|i| BookLevel {
                price: Price::from_raw(price.value() - LEVEL_STEP * Decimal::from(i)),
                size: rng.gen_range(MIN_LEVEL_SIZE..MAX_LEVEL_SIZE),
            })
            .collect();
        Self { bids, asks }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.value() - bid.value()),
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.bids.len().min(self.asks.len())
    }
}
