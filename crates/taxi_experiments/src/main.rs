use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use taxi_core::scenario::ScenarioParams;
use taxi_experiments::{
    export_day_logs_json, export_summary_csv, run_parallel_experiments, ExperimentError,
    ParameterSpace,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "taxi-experiments",
    about = "Run seeded multi-day taxi fleet simulations in parallel"
)]
struct Cli {
    /// JSON file with scenario parameters; missing fields take defaults
    #[arg(long, env = "TAXI_PARAMS")]
    params: Option<PathBuf>,
    /// First seed of the sweep
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of consecutive seeds to run
    #[arg(long, default_value_t = 1)]
    runs: u64,
    /// Days per run
    #[arg(long)]
    days: Option<u64>,
    /// Fleet sizes to sweep, comma separated
    #[arg(long, value_delimiter = ',')]
    taxis: Vec<usize>,
    /// Fare probabilities per junction per minute to sweep, comma separated
    #[arg(long, value_delimiter = ',')]
    fare_probability: Vec<f64>,
    /// Worker threads; defaults to one per core
    #[arg(long)]
    threads: Option<usize>,
    #[arg(long, default_value = "experiment_output")]
    out_dir: PathBuf,
    #[arg(long, default_value = "sweep")]
    experiment_id: String,
    #[arg(long)]
    no_progress: bool,
}

fn load_params(path: Option<&PathBuf>) -> Result<ScenarioParams, ExperimentError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(ScenarioParams::default()),
    }
}

fn run(cli: Cli) -> Result<(), ExperimentError> {
    let base = load_params(cli.params.as_ref())?;
    let mut space = ParameterSpace::from_base(base)
        .experiment_id(cli.experiment_id)
        .seed_range(cli.seed, cli.runs.max(1))
        .num_taxis(cli.taxis)
        .fare_probability(cli.fare_probability);
    if let Some(days) = cli.days {
        space = space.days(vec![days]);
    }
    space.validate()?;

    let sets = space.generate();
    info!(runs = sets.len(), threads = ?cli.threads, "starting sweep");
    let outcomes = run_parallel_experiments(&sets, cli.threads, !cli.no_progress)?;

    fs::create_dir_all(&cli.out_dir)?;
    let summary_path = cli.out_dir.join("summary.csv");
    let days_path = cli.out_dir.join("day_logs.json");
    export_summary_csv(&outcomes, &summary_path)?;
    export_day_logs_json(&outcomes, &days_path)?;

    let completed: u64 = outcomes.iter().map(|o| o.summary.completed).sum();
    let revenue: f64 = outcomes.iter().map(|o| o.summary.dispatcher_revenue).sum();
    info!(
        runs = outcomes.len(),
        completed,
        revenue,
        summary = %summary_path.display(),
        day_logs = %days_path.display(),
        "sweep finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "sweep failed");
            ExitCode::FAILURE
        }
    }
}
