#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use taxi_core::clock::SimulationClock;
use taxi_core::error::SimError;
use taxi_core::runner::{run_next_event, run_until_end, simulation_schedule};

/// Helper that owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default simulation schedule.
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule).expect("no simulation fault")
    }

    /// Run every event up to and including `minute`.
    pub fn run_through_minute(&mut self, world: &mut World, minute: u64) -> Result<usize, SimError> {
        let mut steps = 0;
        loop {
            let next = world.resource::<SimulationClock>().next_event_time();
            match next {
                Some(t) if t <= minute => {
                    if !run_next_event(world, &mut self.schedule)? {
                        break;
                    }
                    steps += 1;
                }
                _ => break,
            }
        }
        Ok(steps)
    }

    /// Drive the simulation to its end minute.
    pub fn run_to_end(&mut self, world: &mut World) -> usize {
        run_until_end(world, &mut self.schedule).expect("no simulation fault")
    }

    pub fn try_run_to_end(&mut self, world: &mut World) -> Result<usize, SimError> {
        run_until_end(world, &mut self.schedule)
    }
}
