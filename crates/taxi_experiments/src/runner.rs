//! Parallel simulation execution using rayon.
//!
//! Each run gets its own world and schedule, so runs share nothing and a
//! sweep's results do not depend on thread count.

use bevy_ecs::prelude::World;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use taxi_core::clock::{EventKind, MINUTES_PER_DAY};
use taxi_core::error::SimError;
use taxi_core::runner::{initialize_simulation, run_until_end_with_hook, simulation_schedule};
use taxi_core::scenario::build_scenario;
use tracing::debug;

use crate::error::{ExperimentError, Result};
use crate::metrics::{summarize, DayLog, DayTracker, RunSummary};
use crate::parameters::ParameterSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub day_logs: Vec<DayLog>,
}

/// Runs one parameter set for all of its days in a single world. A day log is
/// taken at every shift start after the first and once more at the end.
pub fn run_single_simulation(param_set: &ParameterSet) -> Result<RunOutcome> {
    let halted = |source: SimError| ExperimentError::Simulation {
        run_id: param_set.run_id,
        seed: param_set.seed,
        source,
    };

    let params = param_set.scenario_params();
    let mut world = World::new();
    build_scenario(&mut world, &params).map_err(halted)?;
    initialize_simulation(&mut world);

    let mut schedule = simulation_schedule();
    let mut tracker = DayTracker::default();
    let mut day_logs = Vec::new();
    let steps = run_until_end_with_hook(&mut world, &mut schedule, |world, event| {
        if event.kind == EventKind::ShiftStart && event.timestamp > 0 {
            let day = event.timestamp / MINUTES_PER_DAY - 1;
            day_logs.push(tracker.close_day(world, day));
        }
    })
    .map_err(halted)?;

    let last_day = params.end_minute().saturating_sub(1) / MINUTES_PER_DAY;
    if day_logs.last().map_or(true, |log: &DayLog| log.day < last_day) {
        day_logs.push(tracker.close_day(&world, last_day));
    }

    let summary = summarize(&world, param_set, steps);
    debug!(
        run = param_set.run_id,
        seed = param_set.seed,
        steps,
        completed = summary.completed,
        revenue = summary.dispatcher_revenue,
        "run finished"
    );
    Ok(RunOutcome { summary, day_logs })
}

/// Runs every parameter set on a rayon pool. Results come back in input
/// order; the first halted run fails the whole sweep.
pub fn run_parallel_experiments(
    parameter_sets: &[ParameterSet],
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<RunOutcome>> {
    let total = parameter_sets.len();
    let progress = (show_progress && total > 0).then(|| {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar
    });

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    let results = pool.install(|| {
        parameter_sets
            .par_iter()
            .map(|param_set| {
                let outcome = run_single_simulation(param_set);
                if let Some(bar) = &progress {
                    bar.inc(1);
                }
                outcome
            })
            .collect::<Result<Vec<_>>>()
    });

    if let Some(bar) = &progress {
        bar.finish_with_message("Completed");
    }
    results
}
