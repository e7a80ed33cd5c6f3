use clap::{Parser, Subcommand};
use ftm_ranging::utils::logging;
use ftm_ranging::ErrorMap;
use simulator::{run_simple_simulation, ConfigError, SweepRunner};
use std::path::PathBuf;

// ------------------------------------------------------------------------------------------------
// Command Line
// ------------------------------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "simulator", about = "Runs FTM ranging experiments and parameter sweeps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single experiment
    Run {
        #[arg(long, default_value = "simulator/config/experiment.toml")]
        config: PathBuf,
    },
    /// Run every combination of a parameter sweep
    Sweep {
        #[arg(long, default_value = "simulator/config/sweep.toml")]
        config: PathBuf,
    },
    /// Write a synthetic error map
    GenerateMap {
        #[arg(long, default_value_t = 50)]
        width: u32,
        #[arg(long, default_value_t = 50)]
        height: u32,
        #[arg(long, default_value_t = 1.0)]
        resolution: f64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value = "simulator/config/error_map.json")]
        output: PathBuf,
    },
}

// ------------------------------------------------------------------------------------------------
// Main
// ------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    logging::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => {
            let results = run_simple_simulation(&config).await?;
            println!(
                "Simulation complete: {} sessions completed, {} incomplete",
                results.report.completed.len(),
                results.report.incomplete.len()
            );
        }
        Command::Sweep { config } => {
            let runner = SweepRunner::load(&config)?;
            let results = runner.run().await?;
            println!(
                "Sweep '{}' wrote {} combinations to {}",
                results.sweep_name,
                results.combinations.len(),
                runner.results_dir().display()
            );
        }
        Command::GenerateMap { width, height, resolution, seed, output } => {
            let map = ErrorMap::generate(width, height, resolution, seed)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            map.save(&output).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            println!("Wrote {}x{} error map to {}", width, height, output.display());
        }
    }
    Ok(())
}
