use chrono::{DateTime, Local};
use ftm_ranging::orchestrator::{ExperimentConfig, ExperimentReport};
use ftm_ranging::utils::logging;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::stats::{CombinationStats, MetricSeries};

/// Output of one simulation run
#[derive(Debug, Serialize)]
pub struct SimulationResults {
    pub parameters: ExperimentConfig,
    pub report: ExperimentReport,
    pub started_at: String,
    pub wall_time_secs: f64,
}

impl SimulationResults {
    pub fn new(parameters: ExperimentConfig, report: ExperimentReport, started_at: DateTime<Local>, wall_time: Duration) -> Self {
        Self {
            parameters,
            report,
            started_at: started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            wall_time_secs: wall_time.as_secs_f64(),
        }
    }

    /// Writes `output.txt` (the run transcript) and `results.json` into `dir`
    pub fn save_to_directory(&self, dir: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let output_file = dir.join("output.txt");
        fs::write(&output_file, self.report.transcript_text())?;

        let results_file = dir.join("results.json");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&results_file, json)?;

        logging::log("SIMULATOR", &format!("Saved run output to {}", output_file.display()));
        Ok(())
    }
}

/// Aggregated output of a sweep
#[derive(Debug, Serialize)]
pub struct SweepResults {
    pub sweep_name: String,
    pub started_at: String,
    pub repetitions: usize,
    pub parameters: Vec<String>,
    /// Ideal RTT at the base configuration's station distance
    pub ideal_rtt_ps: f64,
    pub combinations: Vec<CombinationStats>,
    pub series: Vec<MetricSeries>,
}

impl SweepResults {
    /// Writes `sweep_results.json` and one `<metric>_series.json` per metric into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let dir = dir.as_ref();
        let combined_file = dir.join("sweep_results.json");
        fs::write(&combined_file, serde_json::to_string_pretty(self)?)?;
        logging::log("SIMULATOR", &format!("Saved combined sweep results to {}", combined_file.display()));

        for series in &self.series {
            let series_file = dir.join(format!("{}_series.json", series.file_stem));
            fs::write(&series_file, serde_json::to_string_pretty(series)?)?;
        }
        Ok(())
    }
}
