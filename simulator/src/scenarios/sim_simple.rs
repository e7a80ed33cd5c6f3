use chrono::Local;
use ftm_ranging::utils::logging;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::config::{Config, ConfigError};
use crate::simulation_results::SimulationResults;

/// Runs a single experiment from the configuration at `config_path`
pub async fn run_simple_simulation(config_path: &Path) -> Result<SimulationResults, ConfigError> {
    // Load configuration
    let config = Config::load(config_path)?;
    let results_dir = config.output.results_dir.clone();
    fs::create_dir_all(&results_dir)?;

    // Setup logging
    setup_logging(&results_dir);
    log_configuration(&config);

    let mut experiment = config.experiment.clone();
    experiment.echo = true;
    if config.output.trace {
        experiment.trace_path = Some(results_dir.join("trace"));
    }

    // Run simulation
    let started_at = Local::now();
    let wall_clock = Instant::now();
    let report = crate::run_simulation::run_simulation(experiment.clone())
        .await
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    // Save results
    let results = SimulationResults::new(experiment, report, started_at, wall_clock.elapsed());
    results.save_to_directory(&results_dir)?;

    Ok(results)
}

/// Sets up logging if ENABLE_LOGS environment variable is set
fn setup_logging(results_dir: &Path) {
    if env::var("ENABLE_LOGS").is_ok() {
        // Delete existing log file if it exists
        let log_path = results_dir.join("simulation.log");
        if let Err(e) = fs::remove_file(&log_path) {
            // Ignore error if file doesn't exist
            if e.kind() != std::io::ErrorKind::NotFound {
                eprintln!("Error deleting log file: {}", e);
            }
        }

        env::set_var("FTM_LOGGING", "true");
        env::set_var("FTM_LOG_FILE", &log_path);
        logging::init_logging();
    }
}

fn log_configuration(config: &Config) {
    let experiment = &config.experiment;
    logging::log("SIMULATOR", "=== Simulation Configuration ===");
    logging::log("SIMULATOR", &format!("Start Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S")));
    logging::log("SIMULATOR", &format!("FTM Params: {}", experiment.ftm));
    logging::log("SIMULATOR", &format!("Number of Stations: {}", experiment.stations));
    logging::log("SIMULATOR", &format!("Layout: {} ({} m)", experiment.layout, experiment.distance));
    logging::log("SIMULATOR", &format!("Channel Bandwidth: {} MHz", experiment.channel_bandwidth_mhz));
    logging::log("SIMULATOR", &format!("Start Mode: {:?}", experiment.start_mode));
    logging::log("SIMULATOR", &format!("Seed: {}", experiment.seed));
    logging::log("SIMULATOR", "=============================");
}
