// 6.0 risk.rs: margin-call / loss-cut / bankruptcy state machine.
// 6.1 next_transition is the whole rulebook as one table: (state, trigger, valuation, profile) -> transition.
// 6.2 RiskMonitor walks the table until it settles, liquidating the ledger when told to.
//
//   NORMAL --ratio < mc--> MARGIN_CALL --ratio < lc / grace expired--> LIQUIDATED --equity <= 0--> BANKRUPT
//      ^                        |
//      +---sale lifts ratio-----+
//
// a loss-cut breach jumps NORMAL straight to LIQUIDATED without issuing a margin call first.

use crate::config::DifficultyProfile;
use crate::margin::Valuation;
use crate::portfolio::{Liquidation, Portfolio};
use crate::types::{Money, PriceMap};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskState {
    #[default]
    Normal,
    MarginCall,
    Liquidated,
    Bankrupt,
}

impl RiskState {
    pub fn allows_trading(&self) -> bool {
        matches!(self, RiskState::Normal | RiskState::MarginCall)
    }

    pub fn is_terminal(&self) -> bool {
        *self == RiskState::Bankrupt
    }
}

impl fmt::Display for RiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskState::Normal => "NORMAL",
            RiskState::MarginCall => "MARGIN_CALL",
            RiskState::Liquidated => "LIQUIDATED",
            RiskState::Bankrupt => "BANKRUPT",
        };
        f.write_str(s)
    }
}

/// Why the table is being consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTrigger {
    /// Regular per-tick revaluation.
    Revaluation,
    /// The margin-call grace period ran out.
    GraceExpired,
    /// A sale just went through.
    SaleExecuted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationReason {
    LossCut,
    GraceExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    IssueMarginCall,
    ForceLiquidation(LiquidationReason),
    CureMarginCall,
    DeclareBankruptcy,
}

impl Transition {
    pub fn target(&self) -> RiskState {
        match self {
            Transition::IssueMarginCall => RiskState::MarginCall,
            Transition::ForceLiquidation(_) => RiskState::Liquidated,
            Transition::CureMarginCall => RiskState::Normal,
            Transition::DeclareBankruptcy => RiskState::Bankrupt,
        }
    }
}

fn below(ratio: Decimal, threshold: Decimal) -> bool {
    threshold > Decimal::ZERO && ratio < threshold
}

/// The transition table. Pure.
pub fn next_transition(
    state: RiskState,
    trigger: RiskTrigger,
    valuation: &Valuation,
    profile: &DifficultyProfile,
) -> Option<Transition> {
    use RiskState::*;

    if state == Bankrupt {
        return None;
    }

    match trigger {
        RiskTrigger::SaleExecuted => {
            let cured = state == MarginCall && valuation.margin_ratio >= profile.margin_call_threshold;
            cured.then_some(Transition::CureMarginCall)
        }
        RiskTrigger::GraceExpired => {
            (state == MarginCall).then_some(Transition::ForceLiquidation(LiquidationReason::GraceExpired))
        }
        RiskTrigger::Revaluation => {
            let in_debt = valuation.has_debt();
            let ratio = valuation.margin_ratio;

            if in_debt && state != Liquidated && below(ratio, profile.loss_cut_threshold) {
                Some(Transition::ForceLiquidation(LiquidationReason::LossCut))
            } else if in_debt && state == Normal && below(ratio, profile.margin_call_threshold) {
                Some(Transition::IssueMarginCall)
            } else if profile.can_go_bankrupt && valuation.is_underwater() {
                Some(Transition::DeclareBankruptcy)
            } else {
                None
            }
        }
    }
}

/// What actually happened, in order, during one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskEvent {
    MarginCallIssued {
        margin_ratio: Decimal,
    },
    MarginCallCured {
        margin_ratio: Decimal,
    },
    Liquidated {
        reason: LiquidationReason,
        liquidation: Liquidation,
    },
    Bankrupt {
        equity: Money,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RiskMonitor {
    state: RiskState,
}

impl RiskMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RiskState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = RiskState::Normal;
    }

    /// Applies transitions until none fire. Liquidation mutates the ledger,
    /// after which the book is revalued and checked again, so a liquidation
    /// that leaves equity at or below zero ends in bankruptcy in the same call.
    pub fn evaluate(
        &mut self,
        trigger: RiskTrigger,
        portfolio: &mut Portfolio,
        prices: &PriceMap,
        profile: &DifficultyProfile,
    ) -> Vec<RiskEvent> {
        let mut events = Vec::new();
        let mut trigger = trigger;

        loop {
            let valuation = portfolio.valuation(prices);
            let Some(transition) = next_transition(self.state, trigger, &valuation, profile) else {
                break;
            };

            let event = match transition {
                Transition::IssueMarginCall => RiskEvent::MarginCallIssued {
                    margin_ratio: valuation.margin_ratio,
                },
                Transition::CureMarginCall => RiskEvent::MarginCallCured {
                    margin_ratio: valuation.margin_ratio,
                },
                Transition::ForceLiquidation(reason) => RiskEvent::Liquidated {
                    reason,
                    liquidation: portfolio.force_liquidate_all(prices),
                },
                Transition::DeclareBankruptcy => RiskEvent::Bankrupt {
                    equity: valuation.equity,
                },
            };

            self.state = transition.target();
            events.push(event);
            // follow-up checks always run against the regular rules
            trigger = RiskTrigger::Revaluation;
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::types::{Leverage, Price, Symbol};
    use rust_decimal_macros::dec;

    fn valuation(borrowed: Decimal, equity: Decimal) -> Valuation {
        let borrowed = Money::new(borrowed);
        let equity = Money::new(equity);
        Valuation {
            cash: Money::zero(),
            holdings_value: equity.add(borrowed),
            total_value: equity.add(borrowed),
            borrowed,
            equity,
            margin_ratio: crate::margin::margin_ratio(equity, borrowed),
            pnl: Money::zero(),
            pnl_percent: Decimal::ZERO,
        }
    }

    fn normal() -> DifficultyProfile {
        Difficulty::Normal.profile()
    }

    #[test]
    fn margin_call_below_threshold() {
        let v = valuation(dec!(1000), dec!(250)); // 0.25
        assert_eq!(
            next_transition(RiskState::Normal, RiskTrigger::Revaluation, &v, &normal()),
            Some(Transition::IssueMarginCall)
        );
        // already in margin call: nothing new
        assert_eq!(
            next_transition(RiskState::MarginCall, RiskTrigger::Revaluation, &v, &normal()),
            None
        );
    }

    #[test]
    fn ratio_at_threshold_is_not_a_breach() {
        let v = valuation(dec!(1000), dec!(300));
        assert_eq!(next_transition(RiskState::Normal, RiskTrigger::Revaluation, &v, &normal()), None);

        let v = valuation(dec!(1000), dec!(200));
        assert_eq!(
            next_transition(RiskState::Normal, RiskTrigger::Revaluation, &v, &normal()),
            Some(Transition::IssueMarginCall)
        );
    }

    #[test]
    fn loss_cut_jumps_straight_from_normal() {
        let v = valuation(dec!(1000), dec!(150));
        assert_eq!(
            next_transition(RiskState::Normal, RiskTrigger::Revaluation, &v, &normal()),
            Some(Transition::ForceLiquidation(LiquidationReason::LossCut))
        );
        assert_eq!(
            next_transition(RiskState::MarginCall, RiskTrigger::Revaluation, &v, &normal()),
            Some(Transition::ForceLiquidation(LiquidationReason::LossCut))
        );
    }

    #[test]
    fn no_debt_means_no_margin_rules() {
        let v = valuation(dec!(0), dec!(10));
        assert_eq!(v.margin_ratio, Decimal::ONE);
        assert_eq!(next_transition(RiskState::Normal, RiskTrigger::Revaluation, &v, &normal()), None);
    }

    #[test]
    fn safe_profile_never_transitions() {
        let safe = Difficulty::Safe.profile();
        let v = valuation(dec!(1000), dec!(-50));
        assert_eq!(next_transition(RiskState::Normal, RiskTrigger::Revaluation, &v, &safe), None);
    }

    #[test]
    fn grace_expiry_only_matters_in_margin_call() {
        let v = valuation(dec!(1000), dec!(250));
        assert_eq!(
            next_transition(RiskState::MarginCall, RiskTrigger::GraceExpired, &v, &normal()),
            Some(Transition::ForceLiquidation(LiquidationReason::GraceExpired))
        );
        assert_eq!(next_transition(RiskState::Normal, RiskTrigger::GraceExpired, &v, &normal()), None);
        // a recovered ratio does not lift the call; only a sale does
        let healthy = valuation(dec!(1000), dec!(600));
        assert_eq!(
            next_transition(RiskState::MarginCall, RiskTrigger::GraceExpired, &healthy, &normal()),
            Some(Transition::ForceLiquidation(LiquidationReason::GraceExpired))
        );
        assert_eq!(
            next_transition(RiskState::Liquidated, RiskTrigger::GraceExpired, &v, &normal()),
            None
        );
    }

    #[test]
    fn sale_cures_at_exact_threshold() {
        let v = valuation(dec!(1000), dec!(300));
        assert_eq!(
            next_transition(RiskState::MarginCall, RiskTrigger::SaleExecuted, &v, &normal()),
            Some(Transition::CureMarginCall)
        );
        let v = valuation(dec!(1000), dec!(299));
        assert_eq!(next_transition(RiskState::MarginCall, RiskTrigger::SaleExecuted, &v, &normal()), None);
    }

    #[test]
    fn bankruptcy_requires_profile_and_is_terminal() {
        let hard = Difficulty::Hard.profile();
        let v = valuation(dec!(0), dec!(-10));
        assert_eq!(
            next_transition(RiskState::Liquidated, RiskTrigger::Revaluation, &v, &hard),
            Some(Transition::DeclareBankruptcy)
        );
        assert_eq!(next_transition(RiskState::Liquidated, RiskTrigger::Revaluation, &v, &normal()), None);
        assert_eq!(next_transition(RiskState::Bankrupt, RiskTrigger::Revaluation, &v, &hard), None);
        assert_eq!(next_transition(RiskState::Bankrupt, RiskTrigger::SaleExecuted, &v, &hard), None);
    }

    #[test]
    fn monitor_liquidates_then_declares_bankruptcy() {
        let hard = Difficulty::Hard.profile();
        let aapl = Symbol::from("AAPL");
        let mut prices = PriceMap::new();
        prices.insert(aapl.clone(), Price::new_unchecked(dec!(200)));

        let mut portfolio = Portfolio::new(Money::new(dec!(1_000_000)));
        portfolio
            .buy(&aapl, 20_000, Leverage::from_int(5).unwrap(), hard.max_leverage, &prices)
            .unwrap();

        prices.insert(aapl, Price::new_unchecked(dec!(140)));
        let mut monitor = RiskMonitor::new();
        let events = monitor.evaluate(RiskTrigger::Revaluation, &mut portfolio, &prices, &hard);

        assert_eq!(events.len(), 2);
        match &events[0] {
            RiskEvent::Liquidated { reason, liquidation } => {
                assert_eq!(*reason, LiquidationReason::LossCut);
                assert_eq!(liquidation.final_equity.value(), dec!(-200_000));
            }
            other => panic!("expected liquidation, got {other:?}"),
        }
        assert_eq!(events[1], RiskEvent::Bankrupt { equity: Money::new(dec!(-200_000)) });
        assert_eq!(monitor.state(), RiskState::Bankrupt);
        assert!(portfolio.holdings.is_empty());
        assert_eq!(portfolio.borrowed, Money::zero());
    }

    #[test]
    fn monitor_settles_after_single_margin_call() {
        let aapl = Symbol::from("AAPL");
        let mut prices = PriceMap::new();
        prices.insert(aapl.clone(), Price::new_unchecked(dec!(180)));

        let mut portfolio = Portfolio::new(Money::new(dec!(1_000_000)));
        portfolio
            .buy(&aapl, 16_000, Leverage::from_int(3).unwrap(), normal().max_leverage, &prices)
            .unwrap();
        prices.insert(aapl, Price::new_unchecked(dec!(151.2)));

        let mut monitor = RiskMonitor::new();
        let first = monitor.evaluate(RiskTrigger::Revaluation, &mut portfolio, &prices, &normal());
        assert!(matches!(first.as_slice(), [RiskEvent::MarginCallIssued { .. }]));

        let second = monitor.evaluate(RiskTrigger::Revaluation, &mut portfolio, &prices, &normal());
        assert!(second.is_empty());
        assert_eq!(monitor.state(), RiskState::MarginCall);
    }

    #[test]
    fn trading_gates() {
        assert!(RiskState::Normal.allows_trading());
        assert!(RiskState::MarginCall.allows_trading());
        assert!(!RiskState::Liquidated.allows_trading());
        assert!(!RiskState::Bankrupt.allows_trading());
        assert!(RiskState::Bankrupt.is_terminal());
    }
}
