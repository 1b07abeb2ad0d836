//! Multi-day runs and seed sweeps for the taxi fare-auction simulation.
//!
//! ```no_run
//! use taxi_experiments::{export_summary_csv, run_parallel_experiments, ParameterSpace};
//!
//! let sets = ParameterSpace::grid()
//!     .seed_range(0, 8)
//!     .num_taxis(vec![8, 16])
//!     .days(vec![3])
//!     .generate();
//! let outcomes = run_parallel_experiments(&sets, None, true)?;
//! export_summary_csv(&outcomes, "summary.csv")?;
//! # Ok::<(), taxi_experiments::ExperimentError>(())
//! ```
//!
//! - [`parameters`]: sweep definition and expansion
//! - [`runner`]: one world per run, executed on a rayon pool
//! - [`metrics`]: day logs and run summaries read from the world
//! - [`export`]: JSON day logs and CSV summaries

pub mod error;
pub mod export;
pub mod metrics;
pub mod parameters;
pub mod runner;

pub use error::ExperimentError;
pub use export::{export_day_logs_json, export_summary_csv};
pub use metrics::{DayLog, DayMetrics, RunSummary};
pub use parameters::{ParameterSet, ParameterSpace};
pub use runner::{run_parallel_experiments, run_single_simulation, RunOutcome};
