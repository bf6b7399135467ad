//! Trading simulator walkthrough.
//!
//! Runs a handful of scripted sessions on the logical clock: a free-running
//! market with news, a margin call that gets cured, a liquidation, and a
//! bankruptcy on the harder profiles.

use rust_decimal_macros::dec;
use trade_dojo_core::*;

fn main() -> Result<(), EngineError> {
    logging::init();

    println!("Trade Dojo Simulation Core");
    println!("Leveraged trading, margin calls, forced liquidation\n");

    scenario_1_live_market()?;
    scenario_2_margin_call_cured()?;
    scenario_3_loss_cut()?;
    scenario_4_bankruptcy()?;
    scenario_5_grace_expiry()?;

    println!("\nAll simulations completed.");
    Ok(())
}

fn lev(x: u32) -> Leverage {
    Leverage::from_int(x).unwrap_or(Leverage::ONE)
}

fn print_valuation(sim: &Simulation) {
    let v = sim.valuation();
    println!(
        "  cash {} | holdings {} | borrowed {} | equity {} | ratio {} | state {}",
        v.cash,
        v.holdings_value,
        v.borrowed,
        v.equity,
        v.margin_ratio.round_dp(4),
        sim.risk_state()
    );
}

fn print_notifications(sim: &Simulation) {
    for n in sim.notifications() {
        println!("  [{} {:?}] {}", n.timestamp.clock_label(), n.severity, n.text);
    }
}

/// Five minutes of random walk and news on the default catalog.
fn scenario_1_live_market() -> Result<(), EngineError> {
    println!("Scenario 1: Live Market\n");

    let mut config = SimulationConfig::with_difficulty(Difficulty::Normal);
    config.seed = 7;
    let mut sim = Simulation::new(config)?;

    sim.start()?;
    sim.run_ticks(300);

    for row in sim.watchlist() {
        println!(
            "  {:<8} {:>10} {:>8}%",
            row.symbol.as_str(),
            row.price.to_string(),
            row.percent_change_since_open.round_dp(2).to_string()
        );
    }
    println!("\n  News after {} ticks:", sim.tick_count());
    for item in sim.news_log().iter().take(5) {
        println!("  [{}] {} ({}%)", item.timestamp.clock_label(), item.rendered_text, item.impact);
    }
    if let Some(book) = sim.market(&Symbol::from("AAPL")).map(|m| &m.order_book) {
        println!(
            "\n  AAPL book: bid {:?} / ask {:?}, {} levels",
            book.best_bid().map(|p| p.value()),
            book.best_ask().map(|p| p.value()),
            book.depth()
        );
    }
    println!();
    Ok(())
}

/// Leveraged buy, price drop, margin call, cured by selling into it.
fn scenario_2_margin_call_cured() -> Result<(), EngineError> {
    println!("Scenario 2: Margin Call Cured\n");

    let mut config = SimulationConfig::scripted(
        Difficulty::Normal,
        vec![Instrument::new("DOJO", "Dojo Holdings", dec!(100), dec!(0))],
    );
    config.initial_cash = Money::new(dec!(1_970_000));
    let mut sim = Simulation::new(config)?;
    let dojo = Symbol::from("DOJO");

    sim.start()?;
    sim.buy(&dojo, 39_700, lev(3))?;
    println!("  Bought 39,700 DOJO @ 100 at 3x");
    print_valuation(&sim);

    sim.apply_impact(&dojo, dec!(-35))?;
    sim.run_ticks(1);
    println!("  DOJO drops 35%");
    print_valuation(&sim);

    sim.sell(&dojo, 1_000)?;
    println!("  Sold 1,000 DOJO to cover");
    print_valuation(&sim);
    print_notifications(&sim);
    println!();
    Ok(())
}

/// A sharp drop straight through the loss-cut line.
fn scenario_3_loss_cut() -> Result<(), EngineError> {
    println!("Scenario 3: Loss Cut\n");

    let mut sim = Simulation::new(SimulationConfig::scripted(
        Difficulty::Normal,
        vec![Instrument::new("AAPL", "Apple Inc.", dec!(180), dec!(0))],
    ))?;
    let aapl = Symbol::from("AAPL");

    sim.start()?;
    sim.buy(&aapl, 16_000, lev(3))?;
    sim.apply_impact(&aapl, dec!(-16))?;
    sim.run_ticks(1);
    sim.apply_impact(&aapl, dec!(-8))?;
    sim.run_ticks(1);

    print_valuation(&sim);
    print_notifications(&sim);

    match sim.buy(&aapl, 1, lev(1)) {
        Err(e) => println!("  Further trading rejected: {e}"),
        Ok(_) => println!("  Unexpected fill after liquidation"),
    }
    println!();
    Ok(())
}

/// Hard mode: liquidation leaves negative equity and the session ends.
fn scenario_4_bankruptcy() -> Result<(), EngineError> {
    println!("Scenario 4: Bankruptcy\n");

    let mut sim = Simulation::new(SimulationConfig::scripted(
        Difficulty::Hard,
        vec![Instrument::new("TSLA", "Tesla Inc.", dec!(200), dec!(0))],
    ))?;
    let tsla = Symbol::from("TSLA");

    sim.start()?;
    sim.buy(&tsla, 20_000, lev(5))?;
    sim.apply_impact(&tsla, dec!(-30))?;
    sim.run_ticks(1);
    let ticks = sim.tick_count();
    sim.run_ticks(10);

    print_valuation(&sim);
    print_notifications(&sim);
    println!("  Ticks after bankruptcy: {}", sim.tick_count() - ticks);
    println!("  Restart allowed: {}", sim.start().is_ok());

    sim.reset();
    println!("  After reset:");
    print_valuation(&sim);
    println!();
    Ok(())
}

/// Margin call left alone until the countdown runs out.
fn scenario_5_grace_expiry() -> Result<(), EngineError> {
    println!("Scenario 5: Margin Call Expiry\n");

    let mut sim = Simulation::new(SimulationConfig::scripted(
        Difficulty::Normal,
        vec![Instrument::new("AAPL", "Apple Inc.", dec!(180), dec!(0))],
    ))?;
    let aapl = Symbol::from("AAPL");

    sim.start()?;
    sim.buy(&aapl, 16_000, lev(3))?;
    sim.apply_impact(&aapl, dec!(-16))?;
    sim.run_ticks(1);
    if let Some(deadline) = sim.margin_call_deadline() {
        println!("  Margin call, deadline {}", deadline.clock_label());
    }

    sim.stop();
    sim.advance_time(600_000);
    println!("  Paused for 10 minutes, state {}", sim.risk_state());

    sim.start()?;
    sim.run_ticks(180);
    print_valuation(&sim);
    print_notifications(&sim);
    println!();
    Ok(())
}
