// 7.0 config.rs: all session settings in one place. difficulty, catalogs, clock, capacities.
// 7.1 Difficulty is a closed set. each variant maps to one fixed DifficultyProfile.

use crate::instrument::{self, Instrument};
use crate::market::MarketParams;
use crate::news::{self, NewsDelay, NewsEventDef};
use crate::types::{Leverage, Money, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Safe,
    #[default]
    Normal,
    Hard,
    Extreme,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [Self::Safe, Self::Normal, Self::Hard, Self::Extreme];

    pub fn profile(self) -> DifficultyProfile {
        match self {
            Self::Safe => DifficultyProfile {
                difficulty: self,
                name: "Safe",
                description: "No borrowing, for beginners",
                max_leverage: Leverage::ONE,
                margin_call_threshold: Decimal::ZERO,
                loss_cut_threshold: Decimal::ZERO,
                can_go_bankrupt: false,
            },
            Self::Normal => DifficultyProfile {
                difficulty: self,
                name: "Normal",
                description: "Up to 3x leverage with margin calls",
                max_leverage: Leverage::new_const(dec!(3)),
                margin_call_threshold: dec!(0.3),
                loss_cut_threshold: dec!(0.2),
                can_go_bankrupt: false,
            },
            Self::Hard => DifficultyProfile {
                difficulty: self,
                name: "Hard",
                description: "Up to 5x leverage, bankruptcy possible",
                max_leverage: Leverage::new_const(dec!(5)),
                margin_call_threshold: dec!(0.35),
                loss_cut_threshold: dec!(0.25),
                can_go_bankrupt: true,
            },
            Self::Extreme => DifficultyProfile {
                difficulty: self,
                name: "Extreme",
                description: "Up to 10x leverage, instant ruin",
                max_leverage: Leverage::new_const(dec!(10)),
                margin_call_threshold: dec!(0.4),
                loss_cut_threshold: dec!(0.3),
                can_go_bankrupt: true,
            },
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SAFE" => Ok(Self::Safe),
            "NORMAL" => Ok(Self::Normal),
            "HARD" => Ok(Self::Hard),
            "EXTREME" => Ok(Self::Extreme),
            _ => Err(ConfigError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// Risk rules of one difficulty. A threshold of zero disables that rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyProfile {
    pub difficulty: Difficulty,
    pub name: &'static str,
    pub description: &'static str,
    pub max_leverage: Leverage,
    pub margin_call_threshold: Decimal,
    pub loss_cut_threshold: Decimal,
    pub can_go_bankrupt: bool,
}

impl DifficultyProfile {
    pub fn margin_calls_enabled(&self) -> bool {
        self.margin_call_threshold > Decimal::ZERO
    }

    pub fn loss_cut_enabled(&self) -> bool {
        self.loss_cut_threshold > Decimal::ZERO
    }
}

// 7.2: timers, all in logical milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    pub tick_interval_ms: i64,
    pub news_delay: NewsDelay,
    pub margin_call_grace_ms: i64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            news_delay: NewsDelay::default(),
            margin_call_grace_ms: 180_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub market: MarketParams,
    pub news_log_capacity: usize,
    pub notification_capacity: usize,
    /// Audit events kept in memory, oldest drained first.
    pub max_events: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            market: MarketParams::default(),
            news_log_capacity: 20,
            notification_capacity: 10,
            max_events: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub difficulty: Difficulty,
    pub initial_cash: Money,
    pub instruments: Vec<Instrument>,
    pub news_catalog: Vec<NewsEventDef>,
    pub watchlist: Vec<Symbol>,
    /// Seeds the session RNG. Same seed, same session.
    pub seed: u64,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            initial_cash: Money::new(dec!(1_000_000)),
            instruments: instrument::default_catalog(),
            news_catalog: news::default_catalog(),
            watchlist: instrument::default_watchlist(),
            seed: 0,
            clock: ClockConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Flat price paths and no news. Prices only move when pushed.
    pub fn scripted(difficulty: Difficulty, instruments: Vec<Instrument>) -> Self {
        let watchlist = instruments.iter().map(|i| i.symbol.clone()).collect();
        Self {
            difficulty,
            instruments: instruments.into_iter().map(Instrument::frozen).collect(),
            news_catalog: Vec::new(),
            watchlist,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.difficulty.profile()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_cash.is_positive() {
            return Err(ConfigError::NonPositiveCash(self.initial_cash));
        }
        if self.instruments.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for inst in &self.instruments {
            if !seen.insert(&inst.symbol) {
                return Err(ConfigError::DuplicateSymbol(inst.symbol.clone()));
            }
            if inst.base_price.value() <= Decimal::ZERO {
                return Err(ConfigError::InvalidBasePrice(inst.symbol.clone()));
            }
            if inst.volatility < Decimal::ZERO {
                return Err(ConfigError::NegativeVolatility(inst.symbol.clone()));
            }
        }

        if let Some(missing) = self.watchlist.iter().find(|s| !seen.contains(s)) {
            return Err(ConfigError::UnknownWatchlistSymbol(missing.clone()));
        }

        for (index, def) in self.news_catalog.iter().enumerate() {
            if def.impact_min > def.impact_max {
                return Err(ConfigError::InvertedImpactRange { index });
            }
            if !(def.fire_probability > 0.0 && def.fire_probability < 1.0) {
                return Err(ConfigError::InvalidProbability {
                    index,
                    probability: def.fire_probability,
                });
            }
        }

        if self.clock.tick_interval_ms <= 0 {
            return Err(ConfigError::InvalidTickInterval(self.clock.tick_interval_ms));
        }
        let delay = self.clock.news_delay;
        if delay.min_ms < 0 || delay.min_ms >= delay.max_ms {
            return Err(ConfigError::InvalidNewsDelay {
                min_ms: delay.min_ms,
                max_ms: delay.max_ms,
            });
        }
        if self.clock.margin_call_grace_ms <= 0 {
            return Err(ConfigError::InvalidGracePeriod(self.clock.margin_call_grace_ms));
        }

        let limits = &self.limits;
        if limits.market.history_len == 0
            || limits.market.book_depth == 0
            || limits.news_log_capacity == 0
            || limits.notification_capacity == 0
            || limits.max_events == 0
        {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Unknown difficulty {0:?}")]
    UnknownDifficulty(String),

    #[error("Initial cash must be positive, got {0}")]
    NonPositiveCash(Money),

    #[error("Instrument catalog is empty")]
    EmptyCatalog,

    #[error("Duplicate instrument symbol {0}")]
    DuplicateSymbol(Symbol),

    #[error("Base price of {0} must be positive")]
    InvalidBasePrice(Symbol),

    #[error("Volatility of {0} must not be negative")]
    NegativeVolatility(Symbol),

    #[error("Watchlist symbol {0} is not in the catalog")]
    UnknownWatchlistSymbol(Symbol),

    #[error("News entry {index}: impact min exceeds max")]
    InvertedImpactRange { index: usize },

    #[error("News entry {index}: fire probability {probability} outside (0, 1)")]
    InvalidProbability { index: usize, probability: f64 },

    #[error("Tick interval must be positive, got {0}ms")]
    InvalidTickInterval(i64),

    #[error("News delay window [{min_ms}, {max_ms}) is empty")]
    InvalidNewsDelay { min_ms: i64, max_ms: i64 },

    #[error("Margin call grace must be positive, got {0}ms")]
    InvalidGracePeriod(i64),

    #[error("Capacities and window lengths must be non-zero")]
    ZeroCapacity,
}
