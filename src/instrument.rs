//! Instrument catalog.
//!
//! An instrument is static configuration: it never changes during a session.
//! Its mutable counterpart is [`crate::market::MarketState`].

use crate::types::{Price, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub display_name: String,
    pub base_price: Price,
    /// Width of the per-tick percentage band. A tick moves price by at most
    /// `volatility / 2` percent either way.
    pub volatility: Decimal,
}

impl Instrument {
    pub fn new(symbol: &str, display_name: &str, base_price: Decimal, volatility: Decimal) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            display_name: display_name.to_string(),
            base_price: Price::new_unchecked(base_price),
            volatility,
        }
    }

    /// Same instrument with a flat price path.
    pub fn frozen(mut self) -> Self {
        self.volatility = Decimal::ZERO;
        self
    }
}

/// The six listed names the simulator trades by default.
pub fn default_catalog() -> Vec<Instrument> {
    vec![
        Instrument::new("AAPL", "Apple Inc.", dec!(180), dec!(0.8)),
        Instrument::new("TSLA", "Tesla Inc.", dec!(250), dec!(2.5)),
        Instrument::new("MSFT", "Microsoft", dec!(380), dec!(0.7)),
        Instrument::new("GOOGL", "Alphabet", dec!(140), dec!(0.9)),
        Instrument::new("7203.T", "Toyota Motor", dec!(2800), dec!(1.2)),
        Instrument::new("NVDA", "NVIDIA", dec!(480), dec!(2.0)),
    ]
}

pub fn default_watchlist() -> Vec<Symbol> {
    ["AAPL", "TSLA", "7203.T"].into_iter().map(Symbol::from).collect()
}

pub fn find<'a>(catalog: &'a [Instrument], symbol: &Symbol) -> Option<&'a Instrument> {
    catalog.iter().find(|i| &i.symbol == symbol)
}
