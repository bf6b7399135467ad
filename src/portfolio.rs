//! Portfolio ledger: cash, share holdings and margin debt.
//!
//! Buying spends own cash first and borrows the rest. Selling repays debt
//! first and keeps the remainder as cash. Every operation either applies in
//! full or returns an error with the ledger untouched.

use crate::margin::{buying_power, calculate_valuation, Valuation};
use crate::types::{Leverage, Money, Price, PriceMap, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub initial_cash: Money,
    pub cash: Money,
    /// Only non-zero positions are stored.
    pub holdings: BTreeMap<Symbol, u64>,
    pub borrowed: Money,
}

/// Outcome of an executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub side: Side,
    pub symbol: Symbol,
    pub quantity: u64,
    pub price: Price,
    pub notional: Money,
    /// Signed change to cash.
    pub cash_change: Money,
    /// Signed change to debt. Positive when a buy borrows, negative when a sell repays.
    pub debt_change: Money,
}

impl Fill {
    pub fn used_margin(&self) -> bool {
        self.debt_change.is_positive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidation {
    /// What was closed and at what price.
    pub closed: Vec<(Symbol, u64, Price)>,
    pub proceeds: Money,
    pub debt_repaid: Money,
    /// Cash left after repaying everything. Negative when the book was underwater.
    pub final_equity: Money,
}

impl Portfolio {
    pub fn new(initial_cash: Money) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            holdings: BTreeMap::new(),
            borrowed: Money::zero(),
        }
    }

    pub fn shares(&self, symbol: &Symbol) -> u64 {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }

    pub fn has_positions(&self) -> bool {
        !self.holdings.is_empty()
    }

    pub fn valuation(&self, prices: &PriceMap) -> Valuation {
        calculate_valuation(self, prices)
    }

    pub fn buying_power(&self, leverage: Leverage, prices: &PriceMap) -> Money {
        buying_power(self.cash, self.valuation(prices).equity, leverage)
    }

    pub fn buy(
        &mut self,
        symbol: &Symbol,
        quantity: u64,
        leverage: Leverage,
        max_leverage: Leverage,
        prices: &PriceMap,
    ) -> Result<Fill, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::ZeroQuantity);
        }
        if leverage > max_leverage {
            return Err(LedgerError::LeverageExceeded {
                requested: leverage,
                max: max_leverage,
            });
        }
        let price = *prices
            .get(symbol)
            .ok_or_else(|| LedgerError::NoPrice(symbol.clone()))?;

        let cost = price.times(quantity);
        let power = self.buying_power(leverage, prices);
        if cost > power {
            return Err(LedgerError::InsufficientBuyingPower {
                cost,
                buying_power: power,
            });
        }

        let cash_used = cost.min(self.cash.max(Money::zero()));
        let borrowed = cost.sub(cash_used);

        self.cash = self.cash.sub(cash_used);
        self.borrowed = self.borrowed.add(borrowed);
        *self.holdings.entry(symbol.clone()).or_insert(0) += quantity;

        Ok(Fill {
            side: Side::Buy,
            symbol: symbol.clone(),
            quantity,
            price,
            notional: cost,
            cash_change: Money::zero().sub(cash_used),
            debt_change: borrowed,
        })
    }

    pub fn sell(&mut self, symbol: &Symbol, quantity: u64, prices: &PriceMap) -> Result<Fill, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::ZeroQuantity);
        }
        let held = self.shares(symbol);
        if held < quantity {
            return Err(LedgerError::InsufficientShares {
                symbol: symbol.clone(),
                held,
                requested: quantity,
            });
        }
        let price = *prices
            .get(symbol)
            .ok_or_else(|| LedgerError::NoPrice(symbol.clone()))?;

        let revenue = price.times(quantity);
        let repay = revenue.min(self.borrowed);
        let credited = revenue.sub(repay);

        self.borrowed = self.borrowed.sub(repay);
        self.cash = self.cash.add(credited);
        if held == quantity {
            self.holdings.remove(symbol);
        } else {
            self.holdings.insert(symbol.clone(), held - quantity);
        }

        Ok(Fill {
            side: Side::Sell,
            symbol: symbol.clone(),
            quantity,
            price,
            notional: revenue,
            cash_change: credited,
            debt_change: Money::zero().sub(repay),
        })
    }

    /// Closes every position at current prices and repays all debt.
    pub fn force_liquidate_all(&mut self, prices: &PriceMap) -> Liquidation {
        let closed: Vec<(Symbol, u64, Price)> = self
            .holdings
            .iter()
            .filter_map(|(symbol, &shares)| prices.get(symbol).map(|&p| (symbol.clone(), shares, p)))
            .collect();
        let proceeds: Money = closed.iter().map(|(_, shares, price)| price.times(*shares)).sum();

        let debt_repaid = self.borrowed;
        let final_equity = self.cash.add(proceeds).sub(debt_repaid);

        self.cash = final_equity;
        self.holdings.clear();
        self.borrowed = Money::zero();

        Liquidation {
            closed,
            proceeds,
            debt_repaid,
            final_equity,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.initial_cash);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Leverage {requested} exceeds the maximum of {max}")]
    LeverageExceeded { requested: Leverage, max: Leverage },

    #[error("Insufficient buying power: cost {cost}, available {buying_power}")]
    InsufficientBuyingPower { cost: Money, buying_power: Money },

    #[error("Insufficient shares of {symbol}: held {held}, requested {requested}")]
    InsufficientShares { symbol: Symbol, held: u64, requested: u64 },

    #[error("Quantity must be at least one share")]
    ZeroQuantity,

    #[error("No price available for {0}")]
    NoPrice(Symbol),
}
