//! Result export: day logs as JSON, one summary row per run as CSV.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::{ExperimentError, Result};
use crate::metrics::DayLog;
use crate::runner::RunOutcome;

#[derive(Serialize)]
struct RunDayLogs<'a> {
    experiment_id: &'a str,
    run_id: usize,
    seed: u64,
    days: &'a [DayLog],
}

fn ensure_not_empty<T>(items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(ExperimentError::NoResults);
    }
    Ok(())
}

/// Writes every run's day logs as a JSON array, one object per run.
pub fn export_day_logs_json(outcomes: &[RunOutcome], path: impl AsRef<Path>) -> Result<()> {
    ensure_not_empty(outcomes)?;
    let runs: Vec<RunDayLogs<'_>> = outcomes
        .iter()
        .map(|o| RunDayLogs {
            experiment_id: &o.summary.experiment_id,
            run_id: o.summary.run_id,
            seed: o.summary.seed,
            days: &o.day_logs,
        })
        .collect();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &runs)?;
    Ok(())
}

/// Writes one CSV row per run with a header taken from [RunSummary](crate::metrics::RunSummary).
pub fn export_summary_csv(outcomes: &[RunOutcome], path: impl AsRef<Path>) -> Result<()> {
    ensure_not_empty(outcomes)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for outcome in outcomes {
        wtr.serialize(&outcome.summary)?;
    }
    wtr.flush()?;
    Ok(())
}
