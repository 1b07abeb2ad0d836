//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule. A fault raised by a system ends the run.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::ecs::SimFault;
use crate::error::SimError;
use crate::scenario::SimulationEndMinute;
use crate::systems::{
    duty::{duty_system, shift_start_system, simulation_started_system},
    fare_expiry::fare_expiry_system,
    fare_inbound::fare_inbound_system,
    movement::movement_system,
    taxi_tick::taxi_tick_system,
    telemetry_snapshot::capture_snapshot_system,
};

fn is_kind(event: Option<Res<CurrentEvent>>, kind: EventKind) -> bool {
    event.map(|e| e.0.kind == kind).unwrap_or(false)
}

fn is_simulation_started(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::SimulationStarted)
}

fn is_shift_start(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::ShiftStart)
}

fn is_tick(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::Tick)
}

fn is_snapshot(event: Option<Res<CurrentEvent>>) -> bool {
    is_kind(event, EventKind::Snapshot)
}

/// Pops the next event unless the clock is empty or the event falls at or past
/// [SimulationEndMinute].
fn pop_due_event(world: &mut World) -> Option<Event> {
    let stop_at = world.get_resource::<SimulationEndMinute>().map(|e| e.0);
    let next = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time())?;
    if stop_at.is_some_and(|end| next >= end) {
        return None;
    }
    world.resource_mut::<SimulationClock>().pop_next()
}

fn take_fault(world: &mut World) -> Option<SimError> {
    world.get_resource_mut::<SimFault>().and_then(|mut f| f.take())
}

/// Runs one simulation step. Returns `Ok(false)` once there is nothing left to
/// run, and the fault if a system raised one.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> Result<bool, SimError> {
    let Some(event) = pop_due_event(world) else {
        return Ok(false);
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    match take_fault(world) {
        Some(error) => Err(error),
        None => Ok(true),
    }
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    mut hook: F,
) -> Result<bool, SimError>
where
    F: FnMut(&World, &Event),
{
    let Some(event) = pop_due_event(world) else {
        return Ok(false);
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    if let Some(error) = take_fault(world) {
        return Err(error);
    }
    hook(world, &event);
    Ok(true)
}

/// Runs steps until nothing is left or `max_steps` is reached. Returns the
/// number of steps executed.
pub fn run_until_empty(
    world: &mut World,
    schedule: &mut Schedule,
    max_steps: usize,
) -> Result<usize, SimError> {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule)? {
        steps += 1;
    }
    Ok(steps)
}

/// Runs until [SimulationEndMinute]. Ticks keep booking further ticks, so the
/// end minute must be set.
pub fn run_until_end(world: &mut World, schedule: &mut Schedule) -> Result<usize, SimError> {
    if world.get_resource::<SimulationEndMinute>().is_none() {
        return Err(SimError::Setup(
            "simulation end minute is required to run to the end".to_string(),
        ));
    }
    let mut steps = 0;
    while run_next_event(world, schedule)? {
        steps += 1;
    }
    Ok(steps)
}

/// Runs until [SimulationEndMinute] and invokes `hook` after each step.
pub fn run_until_end_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    mut hook: F,
) -> Result<usize, SimError>
where
    F: FnMut(&World, &Event),
{
    if world.get_resource::<SimulationEndMinute>().is_none() {
        return Err(SimError::Setup(
            "simulation end minute is required to run to the end".to_string(),
        ));
    }
    let mut steps = 0;
    while run_next_event_with_hook(world, schedule, &mut hook)? {
        steps += 1;
    }
    Ok(steps)
}

/// Builds the simulation schedule. A tick runs duty changes, fare intake,
/// taxi decisions, movement and expiry in that order.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            simulation_started_system.run_if(is_simulation_started),
            shift_start_system.run_if(is_shift_start),
            (
                duty_system,
                fare_inbound_system,
                taxi_tick_system,
                movement_system,
                fare_expiry_system,
            )
                .chain()
                .run_if(is_tick),
            capture_snapshot_system.run_if(is_snapshot),
        )
            .chain(),
    );
    schedule
}

/// Schedules the SimulationStarted event at the current minute. Call this
/// after building the scenario and before running events.
pub fn initialize_simulation(world: &mut World) {
    let mut clock = world.resource_mut::<SimulationClock>();
    let now = clock.now();
    clock.schedule_at(now, EventKind::SimulationStarted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{build_scenario, ScenarioParams};

    #[test]
    fn run_stops_at_end_minute() {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_grid(10, 10, 5)
            .with_taxis(1)
            .without_fare_spawner()
            .with_simulation_end_minute(30);
        build_scenario(&mut world, &params).expect("scenario");
        initialize_simulation(&mut world);

        let mut schedule = simulation_schedule();
        let steps = run_until_end(&mut world, &mut schedule).expect("run");
        // Start, shift start, ticks 0..=29.
        assert_eq!(steps, 32);
        assert_eq!(world.resource::<SimulationClock>().now(), 29);
        assert_eq!(world.resource::<SimulationClock>().next_event_time(), Some(30));
    }

    #[test]
    fn run_to_end_needs_an_end_minute() {
        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        let mut schedule = simulation_schedule();
        assert!(matches!(
            run_until_end(&mut world, &mut schedule),
            Err(SimError::Setup(_))
        ));
    }
}
