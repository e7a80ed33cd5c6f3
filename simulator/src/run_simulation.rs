//! Runs one experiment off the async runtime.

use ftm_ranging::orchestrator::{run_experiment, ExperimentConfig, ExperimentError, ExperimentReport};
use ftm_ranging::utils::logging;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Experiment failed: {0}")]
    Experiment(#[from] ExperimentError),
    #[error("Simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Runs the experiment on the blocking pool so the timeline loop never stalls the runtime
pub async fn run_simulation(config: ExperimentConfig) -> Result<ExperimentReport, SimulationError> {
    logging::log(
        "SIMULATOR",
        &format!("Running {} stations with seed {}", config.stations, config.seed),
    );
    let report = tokio::task::spawn_blocking(move || run_experiment(config)).await??;
    logging::log(
        "SIMULATOR",
        &format!(
            "Run finished: {} sessions completed, {} incomplete",
            report.completed.len(),
            report.incomplete.len()
        ),
    );
    Ok(report)
}
