// 8.3 engine/risk.rs: runs the risk table and turns its outcomes into timers,
// notifications and audit events.

use super::core::Simulation;
use crate::events::{
    BankruptcyEvent, EventPayload, LiquidationEvent, MarginCallCuredEvent, MarginCallEvent, Severity,
};
use crate::risk::{LiquidationReason, RiskEvent, RiskState, RiskTrigger};
use crate::scheduler::Task;
use rust_decimal_macros::dec;

impl Simulation {
    pub(super) fn evaluate_risk(&mut self, trigger: RiskTrigger) {
        let prices = self.prices();
        let before = self.risk.state();
        let outcomes = self
            .risk
            .evaluate(trigger, &mut self.portfolio, &prices, &self.profile);

        let mut previous = before;
        for outcome in outcomes {
            previous = self.apply_risk_event(outcome, previous);
        }
    }

    /// Returns the state the event moved the account into.
    fn apply_risk_event(&mut self, outcome: RiskEvent, previous: RiskState) -> RiskState {
        match outcome {
            RiskEvent::MarginCallIssued { margin_ratio } => {
                let grace = self.config.clock.margin_call_grace_ms;
                let deadline = self.current_time.plus_millis(grace);
                let valuation = self.valuation();

                self.margin_call_deadline = Some(deadline);
                self.scheduler.schedule(deadline, Task::MarginCallExpiry);

                tracing::warn!(
                    ratio = %margin_ratio,
                    threshold = %self.profile.margin_call_threshold,
                    deadline = %deadline.clock_label(),
                    "margin call issued"
                );
                self.notify(
                    format!(
                        "MARGIN CALL: margin ratio {}% is below {}%. Sell positions within {} seconds or they will be liquidated.",
                        pct(margin_ratio),
                        pct(self.profile.margin_call_threshold),
                        grace / 1000
                    ),
                    Severity::Critical,
                    true,
                );
                self.emit_event(EventPayload::MarginCall(MarginCallEvent {
                    margin_ratio,
                    equity: valuation.equity,
                    borrowed: valuation.borrowed,
                    deadline,
                }));
                RiskState::MarginCall
            }
            RiskEvent::MarginCallCured { margin_ratio } => {
                self.clear_countdown();

                tracing::info!(ratio = %margin_ratio, "margin call cured");
                self.notify(
                    format!("Margin call resolved: margin ratio back to {}%", pct(margin_ratio)),
                    Severity::Info,
                    false,
                );
                self.emit_event(EventPayload::MarginCallCured(MarginCallCuredEvent { margin_ratio }));
                RiskState::Normal
            }
            RiskEvent::Liquidated { reason, liquidation } => {
                self.clear_countdown();

                tracing::error!(
                    reason = ?reason,
                    positions = liquidation.closed.len(),
                    final_equity = %liquidation.final_equity,
                    "forced liquidation"
                );
                let why = match reason {
                    LiquidationReason::LossCut => "loss cut triggered",
                    LiquidationReason::GraceExpired => "margin call not met in time",
                };
                self.notify(
                    format!(
                        "FORCED LIQUIDATION ({why}): all positions closed. Final equity: {}",
                        liquidation.final_equity
                    ),
                    Severity::Critical,
                    true,
                );
                self.emit_event(EventPayload::Liquidation(LiquidationEvent {
                    reason,
                    positions_closed: liquidation.closed.len(),
                    proceeds: liquidation.proceeds,
                    debt_repaid: liquidation.debt_repaid,
                    final_equity: liquidation.final_equity,
                    previous_state: previous,
                }));
                RiskState::Liquidated
            }
            RiskEvent::Bankrupt { equity } => {
                self.clear_countdown();
                self.running = false;
                self.scheduler.clear();

                tracing::error!(equity = %equity, "bankrupt; clock halted");
                self.notify(
                    format!("BANKRUPT: equity is {equity}. The session is over until reset."),
                    Severity::Critical,
                    true,
                );
                self.emit_event(EventPayload::Bankruptcy(BankruptcyEvent { equity }));
                RiskState::Bankrupt
            }
        }
    }

    fn clear_countdown(&mut self) {
        self.scheduler.cancel(Task::MarginCallExpiry);
        self.margin_call_deadline = None;
        self.paused_grace_ms = None;
    }
}

fn pct(ratio: rust_decimal::Decimal) -> rust_decimal::Decimal {
    (ratio * dec!(100)).round_dp(2).normalize()
}
