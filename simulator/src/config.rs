//! Configuration loader and validator for the FTM simulator.
//! Handles parsing and validation of single-run and sweep configuration files.

use ftm_ranging::orchestrator::ExperimentConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Repetitions of every sweep combination when the file does not say
pub const DEFAULT_REPETITIONS: usize = 3;

// ------------------------------------------------------------------------------------------------
// Main Configuration Structs
// ------------------------------------------------------------------------------------------------

/// Configuration of a single simulation run.
///
/// The `[experiment]` table holds every operator parameter; anything left out
/// keeps the default of the reference scenario.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Operator parameters of the run
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Where the run's output is written
    pub output: OutputConfig,
}

/// Where results are written
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory receiving `output.txt` and `results.json`
    pub results_dir: PathBuf,
    /// Whether to write the per-frame trace next to the output
    #[serde(default)]
    pub trace: bool,
}

// ------------------------------------------------------------------------------------------------
// Sweep Configuration Structs
// ------------------------------------------------------------------------------------------------

/// Configuration of a parameter sweep.
///
/// `[experiment]` is the base every combination starts from; each `[[sweep.axis]]`
/// names one operator parameter by its command-line name and lists its values.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    #[serde(default)]
    pub experiment: ExperimentConfig,
    pub sweep: SweepParameters,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepParameters {
    /// Name shown on the progress bar and in the saved results
    pub name: String,
    /// Directory the sweep owns; it is wiped when the sweep starts
    pub results_dir: PathBuf,
    /// Runs per combination, each with a fresh random seed
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    /// Swept parameters; the runs cover their Cartesian product
    #[serde(default)]
    pub axis: Vec<SweepAxis>,
}

/// One swept parameter and the values it takes
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SweepAxis {
    /// Command-line name of the parameter, e.g. `channelBandwidth`
    pub name: String,
    pub values: Vec<f64>,
}

fn default_repetitions() -> usize {
    DEFAULT_REPETITIONS
}

// ------------------------------------------------------------------------------------------------
// Error Types and Validation
// ------------------------------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// Trait for common validation functionality
pub trait ValidateConfig {
    fn validate_common(&self) -> Result<(), ConfigError>;
    fn validate_sweep_specific(&self) -> Result<(), ConfigError>;

    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_common()?;
        self.validate_sweep_specific()?;
        Ok(())
    }
}

// Common validation logic
pub fn validate_experiment(experiment: &ExperimentConfig) -> Result<(), ConfigError> {
    experiment
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    if experiment.stations == 0 {
        return Err(ConfigError::ValidationError("Number of stations must be positive".into()));
    }
    Ok(())
}

impl ValidateConfig for Config {
    fn validate_common(&self) -> Result<(), ConfigError> {
        validate_experiment(&self.experiment)
    }

    fn validate_sweep_specific(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl ValidateConfig for SweepConfig {
    fn validate_common(&self) -> Result<(), ConfigError> {
        validate_experiment(&self.experiment)
    }

    fn validate_sweep_specific(&self) -> Result<(), ConfigError> {
        if self.sweep.repetitions == 0 {
            return Err(ConfigError::ValidationError("Repetitions must be positive".into()));
        }
        for (index, axis) in self.sweep.axis.iter().enumerate() {
            if axis.values.is_empty() {
                return Err(ConfigError::ValidationError(format!("Sweep axis '{}' has no values", axis.name)));
            }
            if self.sweep.axis[..index].iter().any(|earlier| earlier.name == axis.name) {
                return Err(ConfigError::ValidationError(format!("Sweep axis '{}' is listed twice", axis.name)));
            }
            // Every value must be accepted by the parameter it targets
            for value in &axis.values {
                let mut probe = self.experiment.clone();
                probe
                    .set_parameter(&axis.name, &value.to_string())
                    .map_err(|e| ConfigError::ValidationError(format!("Sweep axis '{}': {}", axis.name, e)))?;
                validate_experiment(&probe)
                    .map_err(|e| ConfigError::ValidationError(format!("Sweep axis '{}' = {}: {}", axis.name, value, e)))?;
            }
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Configuration Implementation Methods
// ------------------------------------------------------------------------------------------------

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }
}

impl SweepConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let config: SweepConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }
}
