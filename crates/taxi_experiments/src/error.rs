use thiserror::Error;

use taxi_core::error::SimError;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("run {run_id} (seed {seed}) halted: {source}")]
    Simulation {
        run_id: usize,
        seed: u64,
        #[source]
        source: SimError,
    },

    #[error("invalid parameters: {0}")]
    Params(String),

    #[error("no runs to export")]
    NoResults,

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
