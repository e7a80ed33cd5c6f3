use chrono::Local;
use ftm_ranging::ftm::ideal_rtt_ps;
use ftm_ranging::orchestrator::ExperimentConfig;
use ftm_ranging::utils::logging;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ConfigError, SweepAxis, SweepConfig};
use crate::simulation_results::{SimulationResults, SweepResults};
use crate::stats::{metric_series, parse_output, CombinationStats, RunSummary};

/// Range seeds are drawn from for every run
const SEED_RANGE: std::ops::RangeInclusive<u64> = 100_000..=999_999;

/// One point of the sweep: a value for every swept parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub assignments: Vec<(String, f64)>,
}

impl Combination {
    /// Directory name of the combination, `name=value` pairs joined by `_`
    pub fn name(&self) -> String {
        if self.assignments.is_empty() {
            return "baseline".to_string();
        }
        self.assignments
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// The base configuration with this combination's values applied
    pub fn apply(&self, base: &ExperimentConfig) -> Result<ExperimentConfig, ConfigError> {
        let mut config = base.clone();
        for (name, value) in &self.assignments {
            config
                .set_parameter(name, &value.to_string())
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        crate::config::validate_experiment(&config)?;
        Ok(config)
    }
}

/// Cartesian product of the axes. Earlier axes vary fastest.
pub fn combinations(axes: &[SweepAxis]) -> Vec<Combination> {
    let mut combos = vec![Combination { assignments: Vec::new() }];
    for axis in axes {
        let mut next = Vec::with_capacity(combos.len() * axis.values.len());
        for value in &axis.values {
            for combo in &combos {
                let mut assignments = combo.assignments.clone();
                assignments.push((axis.name.clone(), *value));
                next.push(Combination { assignments });
            }
        }
        combos = next;
    }
    combos
}

/// Runs every combination of a sweep `repetitions` times and aggregates the outputs
pub struct SweepRunner {
    sweep_name: String,
    results_dir: PathBuf,
    repetitions: usize,
    axes: Vec<SweepAxis>,
    base: ExperimentConfig,
}

impl SweepRunner {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            sweep_name: config.sweep.name,
            results_dir: config.sweep.results_dir,
            repetitions: config.sweep.repetitions,
            axes: config.sweep.axis,
            base: config.experiment,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(SweepConfig::load(path)?))
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Runs the complete sweep
    pub async fn run(&self) -> Result<SweepResults, ConfigError> {
        // Start from an empty results directory
        self.reset_directory()?;

        // Setup logging
        self.setup_logging();

        let combos = combinations(&self.axes);
        let total_runs = combos.len() * self.repetitions;
        self.log_sweep_start(&combos);

        // Display sweep name before progress bar
        println!("Running Sweep: {}", self.sweep_name);
        let progress_bar = self.create_progress_bar(total_runs);

        let started_at = Local::now();
        let mut all_stats = Vec::with_capacity(combos.len());
        for combo in &combos {
            let combo_name = combo.name();
            let combo_config = combo.apply(&self.base)?;
            let mut runs = RunSummary::default();
            let mut seeds = Vec::with_capacity(self.repetitions);

            for run in 1..=self.repetitions {
                let seed = rand::thread_rng().gen_range(SEED_RANGE);
                seeds.push(seed);
                let run_dir = self.results_dir.join(&combo_name).join(run.to_string());
                fs::create_dir_all(&run_dir)?;

                let mut run_config = combo_config.clone();
                run_config.seed = seed;
                run_config.echo = false;
                run_config.trace_path = Some(run_dir.join(run.to_string()));

                tracing::debug!("Starting run {} of {} with seed {}", run, combo_name, seed);
                let wall_clock = Instant::now();
                let run_started = Local::now();
                let report = crate::run_simulation::run_simulation(run_config.clone())
                    .await
                    .map_err(|e| {
                        ConfigError::ValidationError(format!(
                            "Sweep '{}' failed during run {}/{} of {}: {}",
                            self.sweep_name, run, self.repetitions, combo_name, e
                        ))
                    })?;

                let results = SimulationResults::new(run_config, report, run_started, wall_clock.elapsed());
                results.save_to_directory(&run_dir)?;

                // Aggregate from the saved output, the same text an operator reads
                let output = fs::read_to_string(run_dir.join("output.txt"))?;
                runs.extend(parse_output(&output));

                progress_bar.inc(1);
                progress_bar.set_message(format!("Run {} with {} completed", run, combo_name));
            }

            if runs.mean_rtt_ps.is_empty() {
                tracing::warn!("No session of {} completed before its stop time", combo_name);
            }
            let stats = CombinationStats::from_runs(&combo_name, seeds, &runs, ideal_rtt_ps(combo_config.distance));
            logging::log(
                "SIMULATOR",
                &format!(
                    "{}: mean RTT {:.1} ps (std {:.1}), signal {:.2} dBm, {:.1} measurements",
                    combo_name,
                    stats.mean_rtt_ps.mean,
                    stats.mean_rtt_ps.std,
                    stats.mean_signal_strength_dbm.mean,
                    stats.measurements.mean
                ),
            );
            all_stats.push(stats);
        }

        progress_bar.finish_with_message(format!("{} runs completed", total_runs));
        println!("Sweep simulation complete");

        let ideal_rtt = ideal_rtt_ps(self.base.distance);
        let results = SweepResults {
            sweep_name: self.sweep_name.clone(),
            started_at: started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            repetitions: self.repetitions,
            parameters: self.axes.iter().map(|axis| axis.name.clone()).collect(),
            ideal_rtt_ps: ideal_rtt,
            series: metric_series(&all_stats, ideal_rtt),
            combinations: all_stats,
        };
        results.save(&self.results_dir)?;

        logging::log("SIMULATOR", "=== Sweep Simulation Complete ===");
        logging::log("SIMULATOR", &format!("Total runs completed: {}", total_runs));
        Ok(results)
    }

    /// Removes whatever a previous sweep left behind
    fn reset_directory(&self) -> Result<(), ConfigError> {
        if self.results_dir.exists() {
            fs::remove_dir_all(&self.results_dir)?;
        }
        fs::create_dir_all(&self.results_dir)?;
        Ok(())
    }

    /// Sets up logging if ENABLE_LOGS environment variable is set
    fn setup_logging(&self) {
        if env::var("ENABLE_LOGS").is_ok() {
            let log_path = self.results_dir.join("simulation.log");
            env::set_var("FTM_LOGGING", "true");
            env::set_var("FTM_LOG_FILE", &log_path);
            logging::init_logging();
        }
    }

    /// Creates a progress bar for the sweep
    fn create_progress_bar(&self, total_runs: usize) -> ProgressBar {
        let progress_bar = ProgressBar::new(total_runs as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("+>-");
        progress_bar.set_style(style);
        progress_bar
    }

    /// Logs the start of the sweep
    fn log_sweep_start(&self, combos: &[Combination]) {
        logging::log("SIMULATOR", &format!("=== Sweep {} Simulation ===", self.sweep_name));
        logging::log("SIMULATOR", &format!("Combinations: {}", combos.len()));
        logging::log("SIMULATOR", &format!("Repetitions: {}", self.repetitions));
        for axis in &self.axes {
            logging::log("SIMULATOR", &format!("{} values: {:?}", axis.name, axis.values));
        }
        logging::log("SIMULATOR", "================================");
    }
}
