//! Probabilistic news injector.
//!
//! Each evaluation picks one catalog entry uniformly, then rolls that entry's
//! own fire probability. A hit renders the headline against a random
//! instrument from the full catalog and yields an impact in percent for the
//! caller to apply to that instrument's price.
//!
//! The generator owns no clock: the caller decides when to evaluate and uses
//! [`NewsGenerator::next_delay_ms`] to schedule the next round.

use crate::instrument::Instrument;
use crate::types::{Symbol, Timestamp};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const COMPANY_PLACEHOLDER: &str = "{company}";

/// Impacts strictly beyond this many percent are critical.
pub const CRITICAL_IMPACT_PCT: Decimal = dec!(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsCategory {
    Earnings,
    Technology,
    Corporate,
    Scandal,
    Crash,
    Analyst,
    Market,
    Product,
    Management,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEventDef {
    pub message_template: String,
    /// Percent, `min <= max`.
    pub impact_min: Decimal,
    pub impact_max: Decimal,
    /// In the open interval (0, 1).
    pub fire_probability: f64,
    pub category: NewsCategory,
}

impl NewsEventDef {
    pub fn new(
        template: &str,
        impact_min: Decimal,
        impact_max: Decimal,
        fire_probability: f64,
        category: NewsCategory,
    ) -> Self {
        Self {
            message_template: template.to_string(),
            impact_min,
            impact_max,
            fire_probability,
            category,
        }
    }

    pub fn render(&self, display_name: &str) -> String {
        self.message_template.replacen(COMPANY_PLACEHOLDER, display_name, 1)
    }
}

pub fn default_catalog() -> Vec<NewsEventDef> {
    use NewsCategory::*;
    vec![
        NewsEventDef::new("{company} beats earnings, shares surge", dec!(2), dec!(5), 0.05, Earnings),
        NewsEventDef::new("{company} unveils breakthrough technology", dec!(1.5), dec!(4), 0.04, Technology),
        NewsEventDef::new("{company} announces partnership with major firm", dec!(1), dec!(3), 0.06, Corporate),
        NewsEventDef::new("{company} misses earnings, sellers take over", dec!(-5), dec!(-2), 0.05, Earnings),
        NewsEventDef::new("Scandal uncovered at {company}", dec!(-6), dec!(-3), 0.03, Scandal),
        NewsEventDef::new("Flash crash! {company} plunges", dec!(-15), dec!(-8), 0.01, Crash),
        NewsEventDef::new("Market-wide crash, panic selling spreads", dec!(-10), dec!(-5), 0.02, Crash),
        NewsEventDef::new("Analysts upgrade {company}", dec!(0.5), dec!(2), 0.08, Analyst),
        NewsEventDef::new("Analysts downgrade {company}", dec!(-3), dec!(-1), 0.07, Analyst),
        NewsEventDef::new("Broad market rally lifts {company}", dec!(0.3), dec!(1.5), 0.1, Market),
        NewsEventDef::new("{company} announces product recall", dec!(-4), dec!(-1.5), 0.02, Product),
        NewsEventDef::new("{company} CEO issues bullish outlook", dec!(0.5), dec!(2), 0.05, Management),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsSeverity {
    Normal,
    Critical,
}

impl NewsSeverity {
    pub fn classify(impact_pct: Decimal) -> Self {
        if impact_pct.abs() > CRITICAL_IMPACT_PCT {
            Self::Critical
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsOccurrence {
    pub id: u64,
    pub rendered_text: String,
    /// Signed percent.
    pub impact: Decimal,
    pub target_symbol: Symbol,
    pub timestamp: Timestamp,
    pub severity: NewsSeverity,
    pub category: NewsCategory,
}

impl NewsOccurrence {
    pub fn is_critical(&self) -> bool {
        self.severity == NewsSeverity::Critical
    }

    pub fn is_positive(&self) -> bool {
        self.impact > Decimal::ZERO
    }
}

/// Newest-first log, oldest entries dropped past capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsLog {
    entries: VecDeque<NewsOccurrence>,
    capacity: usize,
}

impl NewsLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, occurrence: NewsOccurrence) {
        self.entries.push_front(occurrence);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn latest(&self) -> Option<&NewsOccurrence> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NewsOccurrence> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<NewsOccurrence> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Jitter window for rescheduling, milliseconds, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsDelay {
    pub min_ms: i64,
    pub max_ms: i64,
}

impl Default for NewsDelay {
    fn default() -> Self {
        Self {
            min_ms: 10_000,
            max_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsGenerator {
    catalog: Vec<NewsEventDef>,
    delay: NewsDelay,
    next_id: u64,
}

impl NewsGenerator {
    pub fn new(catalog: Vec<NewsEventDef>, delay: NewsDelay) -> Self {
        Self {
            catalog,
            delay,
            next_id: 1,
        }
    }

    pub fn catalog(&self) -> &[NewsEventDef] {
        &self.catalog
    }

    /// One round: uniform pick, then that entry's Bernoulli roll.
    pub fn evaluate<R: Rng + ?Sized>(
        &mut self,
        instruments: &[Instrument],
        rng: &mut R,
        now: Timestamp,
    ) -> Option<NewsOccurrence> {
        if self.catalog.is_empty() || instruments.is_empty() {
            return None;
        }

        let def = &self.catalog[rng.gen_range(0..self.catalog.len())];
        if !rng.gen_bool(def.fire_probability) {
            return None;
        }

        let target = &instruments[rng.gen_range(0..instruments.len())];
        let impact = draw_impact(def, rng);

        let occurrence = NewsOccurrence {
            id: self.next_id,
            rendered_text: def.render(&target.display_name),
            impact,
            target_symbol: target.symbol.clone(),
            timestamp: now,
            severity: NewsSeverity::classify(impact),
            category: def.category,
        };
        self.next_id += 1;
        Some(occurrence)
    }

    pub fn next_delay_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen_range(self.delay.min_ms..self.delay.max_ms)
    }
}

/// Uniform over `[impact_min, impact_max]`, kept to 4 decimal places.
pub fn draw_impact<R: Rng + ?Sized>(def: &NewsEventDef, rng: &mut R) -> Decimal {
    let u = Decimal::from_f64(rng.gen::<f64>()).unwrap_or(Decimal::ZERO);
    (def.impact_min + u * (def.impact_max - def.impact_min)).round_dp(4)
}
