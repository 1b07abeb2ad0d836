//! Run one seeded day with a small fleet and print the fares it completed.
//!
//! Run with: cargo run -p taxi_core --example scenario_run

use bevy_ecs::prelude::World;
use taxi_core::dispatcher::Dispatcher;
use taxi_core::runner::{initialize_simulation, run_until_end, simulation_schedule};
use taxi_core::scenario::{build_scenario, ScenarioParams};
use taxi_core::taxi::Taxi;
use taxi_core::telemetry::SimTelemetry;

fn main() -> Result<(), taxi_core::error::SimError> {
    const NUM_TAXIS: usize = 12;
    const SEED: u64 = 123;

    let mut world = World::new();
    let params = ScenarioParams::default()
        .with_seed(SEED)
        .with_taxis(NUM_TAXIS)
        .with_closed_streets(0.05)
        .with_days(1);
    build_scenario(&mut world, &params)?;
    initialize_simulation(&mut world);

    let mut schedule = simulation_schedule();
    let steps = run_until_end(&mut world, &mut schedule)?;

    let telemetry = world.resource::<SimTelemetry>();
    let revenue = world.resource::<Dispatcher>().revenue();
    println!("--- Scenario run ({NUM_TAXIS} taxis, one day, seed {SEED}) ---");
    println!("Steps executed: {steps}");
    println!(
        "Fares: {} announced, {} allocated, {} completed, {} expired",
        telemetry.announced,
        telemetry.allocated,
        telemetry.completed(),
        telemetry.expired
    );
    println!("Dispatcher revenue: {revenue:.2}");
    if let Some(wait) = telemetry.mean_wait() {
        println!("Mean wait at the kerb: {wait:.1} min");
    }

    const SAMPLE: usize = 20;
    for (i, r) in telemetry.completed_fares.iter().take(SAMPLE).enumerate() {
        println!(
            "  {:>3}  taxi={}  {} -> {}  wait={} min  ride={} min  price={:.0}",
            i + 1,
            r.taxi,
            r.origin,
            r.destination,
            r.wait_time(),
            r.ride_time(),
            r.price
        );
    }
    if telemetry.completed() > SAMPLE {
        println!("  ... and {} more", telemetry.completed() - SAMPLE);
    }

    let mut taxis: Vec<(u32, i64, bool)> = world
        .query::<&Taxi>()
        .iter(&world)
        .map(|t| (t.number.0, t.account, t.on_duty))
        .collect();
    taxis.sort();
    println!("\nBalances at end of day:");
    for (number, balance, on_duty) in taxis {
        println!("  taxi {number:>2}: {balance:>5} {}", if on_duty { "on duty" } else { "off duty" });
    }
    Ok(())
}
