//! Valuation and margin math.
//!
//! Everything here is a pure function of the ledger and current prices.
//! Equity is what the account would hold after repaying all debt at current
//! prices; the margin ratio compares that to the debt itself.

use crate::portfolio::Portfolio;
use crate::types::{Leverage, Money, PriceMap, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    pub cash: Money,
    pub holdings_value: Money,
    pub total_value: Money,
    pub borrowed: Money,
    pub equity: Money,
    /// `equity / borrowed` while in debt, 1.0 otherwise.
    pub margin_ratio: Decimal,
    pub pnl: Money,
    pub pnl_percent: Decimal,
}

impl Valuation {
    pub fn has_debt(&self) -> bool {
        self.borrowed.is_positive()
    }

    pub fn is_underwater(&self) -> bool {
        self.equity.value() <= Decimal::ZERO
    }
}

pub fn margin_ratio(equity: Money, borrowed: Money) -> Decimal {
    if borrowed.is_positive() {
        equity.value() / borrowed.value()
    } else {
        Decimal::ONE
    }
}

/// Cash plus the equity that leverage lets you borrow against.
pub fn buying_power(cash: Money, equity: Money, leverage: Leverage) -> Money {
    cash.add(equity.mul(leverage.borrow_multiple()))
}

/// Positions without a known price contribute nothing.
pub fn holdings_value(holdings: &BTreeMap<Symbol, u64>, prices: &PriceMap) -> Money {
    holdings
        .iter()
        .filter_map(|(symbol, &shares)| prices.get(symbol).map(|p| p.times(shares)))
        .sum()
}

pub fn calculate_valuation(portfolio: &Portfolio, prices: &PriceMap) -> Valuation {
    let holdings_value = holdings_value(&portfolio.holdings, prices);
    let total_value = portfolio.cash.add(holdings_value);
    let equity = total_value.sub(portfolio.borrowed);
    let pnl = equity.sub(portfolio.initial_cash);
    let pnl_percent = pnl.value() / portfolio.initial_cash.value() * dec!(100);

    Valuation {
        cash: portfolio.cash,
        holdings_value,
        total_value,
        borrowed: portfolio.borrowed,
        equity,
        margin_ratio: margin_ratio(equity, portfolio.borrowed),
        pnl,
        pnl_percent,
    }
}
