//! Metrics extraction from simulation worlds.
//!
//! A run produces one [DayLog] per simulated day and a [RunSummary] at the
//! end. Telemetry counters are cumulative, so day figures are the difference
//! between two captures.

use bevy_ecs::prelude::World;
use serde::{Deserialize, Serialize};
use taxi_core::dispatcher::Dispatcher;
use taxi_core::taxi::Taxi;
use taxi_core::telemetry::{CompletedFareRecord, SimTelemetry};

use crate::parameters::ParameterSet;

/// Counters read from the world at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    announced: u64,
    rejected: u64,
    allocated: u64,
    expired: u64,
    cancelled: u64,
    completed: usize,
    dispatcher_revenue: f64,
}

impl Totals {
    fn capture(world: &World) -> Self {
        let mut totals = Totals::default();
        if let Some(telemetry) = world.get_resource::<SimTelemetry>() {
            totals.announced = telemetry.announced;
            totals.rejected = telemetry.rejected;
            totals.allocated = telemetry.allocated;
            totals.expired = telemetry.expired;
            totals.cancelled = telemetry.cancelled;
            totals.completed = telemetry.completed();
        }
        if let Some(dispatcher) = world.get_resource::<Dispatcher>() {
            totals.dispatcher_revenue = dispatcher.revenue();
        }
        totals
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FleetState {
    taxis: usize,
    on_duty: usize,
    broke: usize,
    balance: i64,
}

impl FleetState {
    fn capture(world: &World) -> Self {
        world
            .iter_entities()
            .filter_map(|entity| entity.get::<Taxi>())
            .fold(FleetState::default(), |mut state, taxi| {
                state.taxis += 1;
                state.on_duty += usize::from(taxi.on_duty);
                state.broke += usize::from(taxi.account <= 0);
                state.balance += taxi.account;
                state
            })
    }
}

/// Activity within one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayMetrics {
    pub announced: u64,
    pub rejected: u64,
    pub allocated: u64,
    pub completed: u64,
    pub expired: u64,
    pub cancelled: u64,
    /// Revenue the dispatcher booked during the day.
    pub dispatcher_revenue: f64,
    pub mean_wait_minutes: Option<f64>,
    /// Fleet state at the close of the day.
    pub taxis_on_duty: usize,
    pub broke_taxis: usize,
    pub fleet_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayLog {
    pub day: u64,
    pub metrics: DayMetrics,
}

/// Turns cumulative telemetry into per-day logs. Call
/// [close_day](Self::close_day) once per day, in order.
#[derive(Debug, Default)]
pub struct DayTracker {
    last: Totals,
}

impl DayTracker {
    pub fn close_day(&mut self, world: &World, day: u64) -> DayLog {
        let now = Totals::capture(world);
        let fleet = FleetState::capture(world);
        let today: &[CompletedFareRecord] = world
            .get_resource::<SimTelemetry>()
            .map(|t| t.completed_fares.get(self.last.completed..).unwrap_or(&[]))
            .unwrap_or(&[]);
        let waits: Vec<u64> = today.iter().map(|r| r.wait_time()).collect();

        let metrics = DayMetrics {
            announced: now.announced - self.last.announced,
            rejected: now.rejected - self.last.rejected,
            allocated: now.allocated - self.last.allocated,
            completed: (now.completed - self.last.completed) as u64,
            expired: now.expired - self.last.expired,
            cancelled: now.cancelled - self.last.cancelled,
            dispatcher_revenue: now.dispatcher_revenue - self.last.dispatcher_revenue,
            mean_wait_minutes: mean(&waits),
            taxis_on_duty: fleet.on_duty,
            broke_taxis: fleet.broke,
            fleet_balance: fleet.balance,
        };
        self.last = now;
        DayLog { day, metrics }
    }
}

/// Outcome of one run, one row of the summary CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub experiment_id: String,
    pub run_id: usize,
    pub seed: u64,
    pub num_taxis: usize,
    pub days: u64,
    pub fare_probability: f64,
    pub revenue_share: f64,
    pub steps: usize,
    pub announced: u64,
    pub rejected: u64,
    pub allocated: u64,
    pub completed: u64,
    pub expired: u64,
    pub cancelled: u64,
    pub dispatcher_revenue: f64,
    pub fares_collected: f64,
    pub avg_wait_minutes: f64,
    pub median_wait_minutes: f64,
    pub p90_wait_minutes: f64,
    pub avg_ride_minutes: f64,
    pub fleet_balance: i64,
    pub broke_taxis: usize,
}

pub fn summarize(world: &World, param_set: &ParameterSet, steps: usize) -> RunSummary {
    let totals = Totals::capture(world);
    let fleet = FleetState::capture(world);
    let records: &[CompletedFareRecord] = world
        .get_resource::<SimTelemetry>()
        .map_or(&[], |t| t.completed_fares.as_slice());

    let waits: Vec<u64> = records.iter().map(|r| r.wait_time()).collect();
    let rides: Vec<u64> = records.iter().map(|r| r.ride_time()).collect();
    let (avg_wait, median_wait, p90_wait) = calculate_stats(&waits);
    let (avg_ride, _, _) = calculate_stats(&rides);

    RunSummary {
        experiment_id: param_set.experiment_id.clone(),
        run_id: param_set.run_id,
        seed: param_set.seed,
        num_taxis: fleet.taxis,
        days: param_set.params.days,
        fare_probability: param_set.params.fares.fare_probability,
        revenue_share: param_set.params.dispatcher.revenue_share,
        steps,
        announced: totals.announced,
        rejected: totals.rejected,
        allocated: totals.allocated,
        completed: totals.completed as u64,
        expired: totals.expired,
        cancelled: totals.cancelled,
        dispatcher_revenue: totals.dispatcher_revenue,
        fares_collected: records.iter().map(|r| r.price).sum(),
        avg_wait_minutes: avg_wait,
        median_wait_minutes: median_wait,
        p90_wait_minutes: p90_wait,
        avg_ride_minutes: avg_ride,
        fleet_balance: fleet.balance,
        broke_taxis: fleet.broke,
    }
}

fn mean(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<u64>() as f64 / values.len() as f64)
    }
}

/// Average, median and 90th percentile; zeros when empty.
fn calculate_stats(values: &[u64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let avg = sorted.iter().sum::<u64>() as f64 / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    } else {
        sorted[n / 2] as f64
    };
    let p90 = sorted[((n - 1) as f64 * 0.9) as usize] as f64;

    (avg, median, p90)
}
