pub mod config;
pub mod run_simulation;
pub mod scenarios;
pub mod simulation_results;
pub mod stats;

pub use config::{Config, ConfigError, SweepConfig};
pub use run_simulation::{run_simulation, SimulationError};
pub use scenarios::sim_simple::run_simple_simulation;
pub use scenarios::sweep_runner::{combinations, Combination, SweepRunner};
pub use simulation_results::{SimulationResults, SweepResults};
pub use stats::{metric_series, parse_output, CombinationStats, MetricPoint, MetricSeries, RunSummary, Summary};
