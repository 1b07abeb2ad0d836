//! Clock bookkeeping and duty changes: shift starts, the per-minute tick
//! chain, and taxis entering or leaving their duty window.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{EventKind, SimulationClock, MINUTES_PER_DAY};
use crate::dispatcher::Dispatcher;
use crate::taxi::Taxi;
use crate::telemetry::SimSnapshotConfig;

/// Seeds the clock: first shift and first tick at minute 0, first snapshot
/// one interval in.
pub fn simulation_started_system(
    mut clock: ResMut<SimulationClock>,
    snapshot_config: Option<Res<SimSnapshotConfig>>,
) {
    let now = clock.now();
    clock.schedule_at(now, EventKind::ShiftStart);
    clock.schedule_at(now, EventKind::Tick);
    if let Some(config) = snapshot_config {
        clock.schedule_at(now + config.interval_minutes.max(1), EventKind::Snapshot);
    }
}

/// Opens a new shift for every taxi and books the next one a day later.
pub fn shift_start_system(mut clock: ResMut<SimulationClock>, mut taxis: Query<&mut Taxi>) {
    for mut taxi in &mut taxis {
        taxi.shift_open = true;
    }
    clock.schedule_in(MINUTES_PER_DAY, EventKind::ShiftStart);
    tracing::debug!(day = clock.day(), "shift start");
}

/// First system of every tick: books the next tick, syncs the dispatcher's
/// clock and moves taxis on or off duty.
pub fn duty_system(
    mut clock: ResMut<SimulationClock>,
    mut dispatcher: ResMut<Dispatcher>,
    mut taxis: Query<&mut Taxi>,
) {
    let now = clock.now();
    clock.schedule_in(1, EventKind::Tick);
    dispatcher.clock_tick(now);

    let minute_of_day = now % MINUTES_PER_DAY;
    for mut taxi in &mut taxis {
        if !taxi.on_duty {
            taxi.come_on_duty(minute_of_day);
        } else if !taxi.config.in_window(minute_of_day) && taxi.passenger.is_none() {
            taxi.go_off_duty();
        }
    }
}
