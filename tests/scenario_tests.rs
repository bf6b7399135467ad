//! End-to-end sessions on flat price paths.
//!
//! Instruments are frozen (volatility 0) and the news catalog is empty, so
//! prices only move through `apply_impact` and every number below is exact.

use rust_decimal_macros::dec;
use trade_dojo_core::*;

fn session(difficulty: Difficulty, base: rust_decimal::Decimal) -> (Simulation, Symbol) {
    let config = SimulationConfig::scripted(
        difficulty,
        vec![Instrument::new("AAPL", "Apple Inc.", base, dec!(0.8))],
    );
    (Simulation::new(config).unwrap(), Symbol::from("AAPL"))
}

fn lev(x: u32) -> Leverage {
    Leverage::from_int(x).unwrap()
}

fn count_critical(sim: &Simulation) -> usize {
    sim.notifications().filter(|n| n.severity == Severity::Critical).count()
}

fn margin_call_events(sim: &Simulation) -> usize {
    sim.events()
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::MarginCall(_)))
        .count()
}

#[test]
fn safe_mode_never_borrows() {
    let mut config = SimulationConfig::with_difficulty(Difficulty::Safe);
    config.seed = 42;
    let mut sim = Simulation::new(config).unwrap();
    let aapl = Symbol::from("AAPL");

    // cash covers 5,555 shares at 180, not 5,556
    let err = sim.buy(&aapl, 5_556, lev(1)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Ledger(LedgerError::InsufficientBuyingPower { .. })
    ));

    let err = sim.buy(&aapl, 1, lev(2)).unwrap_err();
    assert!(matches!(err, EngineError::Ledger(LedgerError::LeverageExceeded { .. })));

    sim.start().unwrap();
    sim.buy(&aapl, 5_000, lev(1)).unwrap();
    for _ in 0..50 {
        sim.run_ticks(10);
        assert_eq!(sim.portfolio().borrowed, Money::zero());
        let _ = sim.sell(&aapl, 100);
        let _ = sim.buy(&Symbol::from("MSFT"), 10, lev(1));
    }
    assert_eq!(sim.portfolio().borrowed, Money::zero());
    assert_eq!(sim.risk_state(), RiskState::Normal);
}

#[test]
fn normal_mode_margin_call_then_liquidation() {
    let (mut sim, aapl) = session(Difficulty::Normal, dec!(180));
    sim.start().unwrap();

    let fill = sim.buy(&aapl, 16_000, lev(3)).unwrap();
    assert_eq!(fill.debt_change.value(), dec!(1_880_000));
    assert_eq!(count_critical(&sim), 0);

    sim.apply_impact(&aapl, dec!(-16)).unwrap();
    sim.run_ticks(1);

    assert_eq!(sim.risk_state(), RiskState::MarginCall);
    let ratio = sim.valuation().margin_ratio;
    assert!(ratio < dec!(0.3) && ratio > dec!(0.2), "ratio {ratio}");
    assert!(sim.margin_call_deadline().is_some());

    // staying below the threshold does not re-issue
    sim.run_ticks(5);
    assert_eq!(margin_call_events(&sim), 1);
    assert_eq!(count_critical(&sim), 1);

    sim.apply_impact(&aapl, dec!(-8)).unwrap();
    assert_eq!(sim.price(&aapl).unwrap().value(), dec!(139.10));
    sim.run_ticks(1);

    assert_eq!(sim.risk_state(), RiskState::Liquidated);
    assert!(sim.portfolio().holdings.is_empty());
    assert_eq!(sim.portfolio().borrowed, Money::zero());
    assert_eq!(sim.portfolio().cash.value(), dec!(345_600));
    assert!(sim.margin_call_deadline().is_none());

    let last = sim.notifications().next().unwrap();
    assert_eq!(last.severity, Severity::Critical);
    assert!(last.alert);
    assert!(last.text.contains("345600"));

    // normal profile cannot go bankrupt, ticks keep going
    let ticks = sim.tick_count();
    sim.run_ticks(3);
    assert_eq!(sim.tick_count(), ticks + 3);
    assert!(matches!(
        sim.buy(&aapl, 1, lev(1)),
        Err(EngineError::TradeRejectedState(RiskState::Liquidated))
    ));
}

#[test]
fn sharp_drop_skips_margin_call() {
    let (mut sim, aapl) = session(Difficulty::Normal, dec!(180));
    sim.start().unwrap();
    sim.buy(&aapl, 16_000, lev(3)).unwrap();

    sim.apply_impact(&aapl, dec!(-24)).unwrap();
    sim.run_ticks(1);

    assert_eq!(sim.risk_state(), RiskState::Liquidated);
    assert_eq!(margin_call_events(&sim), 0);

    let liquidation = sim
        .events()
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::Liquidation(l) => Some(l.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(liquidation.reason, LiquidationReason::LossCut);
    assert_eq!(liquidation.previous_state, RiskState::Normal);
}

#[test]
fn hard_mode_bankruptcy_halts_session() {
    let (mut sim, aapl) = session(Difficulty::Hard, dec!(200));
    sim.start().unwrap();

    let fill = sim.buy(&aapl, 20_000, lev(5)).unwrap();
    assert_eq!(fill.debt_change.value(), dec!(3_000_000));

    sim.apply_impact(&aapl, dec!(-30)).unwrap();
    sim.run_ticks(1);

    assert_eq!(sim.risk_state(), RiskState::Bankrupt);
    assert!(!sim.is_running());
    assert_eq!(sim.portfolio().cash.value(), dec!(-200_000));
    assert!(sim.portfolio().holdings.is_empty());

    // liquidation first, bankruptcy right after
    let kinds: Vec<&str> = sim
        .events()
        .iter()
        .filter_map(|e| match e.payload {
            EventPayload::Liquidation(_) => Some("liquidation"),
            EventPayload::Bankruptcy(_) => Some("bankruptcy"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["liquidation", "bankruptcy"]);

    assert!(matches!(
        sim.buy(&aapl, 1, lev(1)),
        Err(EngineError::TradeRejectedState(RiskState::Bankrupt))
    ));
    assert!(matches!(
        sim.sell(&aapl, 1),
        Err(EngineError::TradeRejectedState(RiskState::Bankrupt))
    ));

    let ticks = sim.tick_count();
    let history = sim.market(&aapl).unwrap().price_history.len();
    sim.run_ticks(30);
    assert_eq!(sim.tick_count(), ticks);
    assert_eq!(sim.market(&aapl).unwrap().price_history.len(), history);

    assert!(matches!(sim.start(), Err(EngineError::SessionHalted(RiskState::Bankrupt))));
    assert!(matches!(
        sim.apply_impact(&aapl, dec!(5)),
        Err(EngineError::SessionHalted(RiskState::Bankrupt))
    ));

    sim.reset();
    assert_eq!(sim.risk_state(), RiskState::Normal);
    assert_eq!(sim.portfolio().cash.value(), dec!(1_000_000));
    assert_eq!(sim.price(&aapl).unwrap().value(), dec!(200));
    assert!(sim.start().is_ok());
}

#[test]
fn zero_volatility_keeps_price_flat() {
    let (mut sim, aapl) = session(Difficulty::Normal, dec!(180));
    sim.start().unwrap();
    sim.run_ticks(120);

    let market = sim.market(&aapl).unwrap();
    assert_eq!(market.current_price.value(), dec!(180));
    assert_eq!(market.high.value(), dec!(180));
    assert_eq!(market.low.value(), dec!(180));
    assert_eq!(market.price_history.len(), 60);
    assert!(market.price_history.iter().all(|p| p.price.value() == dec!(180)));
    assert!(market.volume >= 120 * 100);
}

#[test]
fn sale_to_exact_threshold_cures_margin_call() {
    let mut config = SimulationConfig::scripted(
        Difficulty::Normal,
        vec![Instrument::new("DOJO", "Dojo Holdings", dec!(100), dec!(0))],
    );
    config.initial_cash = Money::new(dec!(1_970_000));
    let mut sim = Simulation::new(config).unwrap();
    let dojo = Symbol::from("DOJO");
    sim.start().unwrap();

    let fill = sim.buy(&dojo, 39_700, lev(3)).unwrap();
    assert_eq!(fill.debt_change.value(), dec!(2_000_000));

    sim.apply_impact(&dojo, dec!(-35)).unwrap();
    sim.run_ticks(1);
    assert_eq!(sim.risk_state(), RiskState::MarginCall);
    assert_eq!(sim.valuation().margin_ratio, dec!(0.29025));

    // not enough yet
    sim.sell(&dojo, 100).unwrap();
    assert_eq!(sim.risk_state(), RiskState::MarginCall);

    sim.sell(&dojo, 900).unwrap();
    assert_eq!(sim.portfolio().borrowed.value(), dec!(1_935_000));
    assert_eq!(sim.valuation().margin_ratio, dec!(0.3));
    assert_eq!(sim.risk_state(), RiskState::Normal);
    assert!(sim.margin_call_deadline().is_none());

    let note = sim.notifications().next().unwrap();
    assert_eq!(note.severity, Severity::Info);
    assert!(note.text.contains("resolved"));

    // the cancelled countdown never fires and the ratio sits on the threshold
    sim.run_ticks(200);
    assert_eq!(sim.risk_state(), RiskState::Normal);
}

#[test]
fn snapshot_carries_the_read_model() {
    let (mut sim, aapl) = session(Difficulty::Normal, dec!(180));
    sim.start().unwrap();
    sim.buy(&aapl, 16_000, lev(3)).unwrap();
    sim.apply_impact(&aapl, dec!(-16)).unwrap();
    sim.run_ticks(1);

    let snap = sim.snapshot();
    assert_eq!(snap.risk_state, RiskState::MarginCall);
    assert_eq!(snap.margin_call_deadline, Some(Timestamp::from_millis(181_000)));
    assert_eq!(snap.holdings.get(&aapl), Some(&16_000));
    assert_eq!(snap.price(&aapl).map(|p| p.value()), Some(dec!(151.2)));
    assert_eq!(snap.watchlist[0].percent_change_since_open, dec!(-16));
    assert_eq!(snap.notifications[0].severity, Severity::Critical);
    assert!(snap.to_json().unwrap().contains("MARGIN_CALL"));
}
