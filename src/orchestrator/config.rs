use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::channel::{FrequencyBand, LossModelKind};
use crate::error_model::{ChannelBandwidth, ErrorMap};
use crate::geometry::Layout;
use crate::types::constants::{DEFAULT_INTER_SESSION_GAP_SECS, DEFAULT_STOP_SECS};
use crate::types::{FtmParams, SimTime};

use super::ConfigError;

/// When each station's session starts, relative to the start of the run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum StartMode {
    /// Every session starts at time zero
    Immediate,
    /// Station `i` starts at `i * gap_secs`
    Staggered { gap_secs: f64 },
}

impl Default for StartMode {
    fn default() -> Self {
        StartMode::Staggered {
            gap_secs: DEFAULT_INTER_SESSION_GAP_SECS as f64,
        }
    }
}

impl StartMode {
    pub fn offset(&self, station_index: usize) -> SimTime {
        match self {
            StartMode::Immediate => SimTime::ZERO,
            StartMode::Staggered { gap_secs } => SimTime::from_secs_f64(*gap_secs) * station_index as u64,
        }
    }
}

/// Where the spatial error map comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorMapSource {
    /// A JSON map file
    File(PathBuf),
    /// A synthetic map drawn from the run's seed
    Generated { width: u32, height: u32 },
}

impl Default for ErrorMapSource {
    fn default() -> Self {
        ErrorMapSource::Generated { width: 50, height: 50 }
    }
}

impl ErrorMapSource {
    pub fn resolve(&self, seed: u64) -> Result<ErrorMap, ConfigError> {
        let map = match self {
            ErrorMapSource::File(path) => ErrorMap::load(path)?,
            ErrorMapSource::Generated { width, height } => ErrorMap::generate(*width, *height, 1.0, seed)?,
        };
        Ok(map)
    }
}

/// Every operator parameter of one experiment run.
///
/// Built once before setup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Parameter bundle each session is given
    pub ftm: FtmParams,
    /// Frequency band code: 0 for 2.4 GHz, 1 for 5 GHz
    pub frequency: u8,
    pub rx_gain_db: f64,
    /// Propagation loss model code: 0 for 3GPP indoor office, 1 for Nakagami
    pub propagation_loss_model: u8,
    pub stations: usize,
    pub channel_bandwidth_mhz: u32,
    /// Station spacing in metres
    pub distance: f64,
    pub layout: Layout,
    pub start_mode: StartMode,
    /// Simulated stop time; defaults to 100 s after the last session start
    pub stop_secs: Option<f64>,
    pub error_map: ErrorMapSource,
    /// Frame trace prefix; the trace is written to `<prefix>.jsonl`
    pub trace_path: Option<PathBuf>,
    pub seed: u64,
    /// Print the run transcript to stdout as it is produced
    pub echo: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            ftm: FtmParams::default(),
            frequency: 1,
            rx_gain_db: 0.0,
            propagation_loss_model: 0,
            stations: 1,
            channel_bandwidth_mhz: 20,
            distance: 5.0,
            layout: Layout::Circle,
            start_mode: StartMode::default(),
            stop_secs: None,
            error_map: ErrorMapSource::default(),
            trace_path: None,
            seed: 1,
            echo: false,
        }
    }
}

impl ExperimentConfig {
    pub fn frequency_band(&self) -> Result<FrequencyBand, ConfigError> {
        Ok(FrequencyBand::try_from(self.frequency)?)
    }

    pub fn loss_model(&self) -> Result<LossModelKind, ConfigError> {
        Ok(LossModelKind::try_from(self.propagation_loss_model)?)
    }

    pub fn bandwidth(&self) -> Result<ChannelBandwidth, ConfigError> {
        Ok(ChannelBandwidth::try_from(self.channel_bandwidth_mhz)?)
    }

    /// Checks every configuration-domain constraint. Nothing is built or scheduled here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.frequency_band()?;
        self.loss_model()?;
        self.bandwidth()?;
        self.ftm.validate()?;
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(ConfigError::Invalid(format!("distance must be positive, got {}", self.distance)));
        }
        if !self.rx_gain_db.is_finite() {
            return Err(ConfigError::Invalid("rx gain must be finite".into()));
        }
        if let StartMode::Staggered { gap_secs } = self.start_mode {
            if !(gap_secs.is_finite() && gap_secs >= 0.0) {
                return Err(ConfigError::Invalid(format!("inter-session gap must be non-negative, got {}", gap_secs)));
            }
        }
        if let Some(stop) = self.stop_secs {
            if !(stop.is_finite() && stop >= 0.0) {
                return Err(ConfigError::Invalid(format!("stop time must be non-negative, got {}", stop)));
            }
        }
        Ok(())
    }

    /// Sets one operator parameter by its command-line name, e.g. `("burstDuration", "10")`
    pub fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name {
            "numberOfBurstsExponent" => self.ftm.number_of_bursts_exponent = parse(name, value)?,
            "burstDuration" => self.ftm.burst_duration = parse(name, value)?,
            "minDeltaFtm" => self.ftm.min_delta_ftm = parse(name, value)?,
            "partialTsfTimer" => self.ftm.partial_tsf_timer = parse(name, value)?,
            "partialTsfNoPref" => self.ftm.partial_tsf_no_pref = parse_flag(name, value)?,
            "asapCapable" => self.ftm.asap_capable = parse_flag(name, value)?,
            "asap" => self.ftm.asap = parse_flag(name, value)?,
            "ftmsPerBurst" => self.ftm.ftms_per_burst = parse(name, value)?,
            "formatAndBandwidth" => self.ftm.format_and_bandwidth = parse(name, value)?,
            "burstPeriod" => self.ftm.burst_period = parse(name, value)?,
            "frequency" => self.frequency = parse(name, value)?,
            "rxGain" => self.rx_gain_db = parse(name, value)?,
            "propagationLossModel" => self.propagation_loss_model = parse(name, value)?,
            "numberOfStations" => self.stations = parse(name, value)?,
            "channelBandwidth" => self.channel_bandwidth_mhz = parse(name, value)?,
            "distance" => self.distance = parse(name, value)?,
            "layout" => {
                self.layout = value
                    .parse()
                    .map_err(|e: crate::geometry::GeometryError| ConfigError::Invalid(e.to_string()))?
            }
            "interSessionGap" => {
                self.start_mode = StartMode::Staggered {
                    gap_secs: parse(name, value)?,
                }
            }
            "stopTime" => self.stop_secs = Some(parse(name, value)?),
            "seed" | "RngRun" => self.seed = parse(name, value)?,
            other => return Err(ConfigError::Invalid(format!("unknown parameter '{}'", other))),
        }
        Ok(())
    }

    /// Start offset of every station, in index order
    pub fn start_offsets(&self) -> Vec<SimTime> {
        (0..self.stations).map(|index| self.start_mode.offset(index)).collect()
    }

    /// Stop time of the run
    pub fn stop_time(&self) -> SimTime {
        match self.stop_secs {
            Some(secs) => SimTime::from_secs_f64(secs),
            None => {
                let last_start = self.start_offsets().into_iter().max().unwrap_or(SimTime::ZERO);
                last_start.saturating_add(SimTime::from_secs(DEFAULT_STOP_SECS))
            }
        }
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    let value = value.trim();
    // Sweep values arrive as floats; accept "10.0" where an integer is expected
    let normalized = value.strip_suffix(".0").unwrap_or(value);
    normalized
        .parse()
        .or_else(|_| value.parse())
        .map_err(|_| ConfigError::Invalid(format!("invalid value '{}' for {}", value, name)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "1.0" | "true" => Ok(true),
        "0" | "0.0" | "false" => Ok(false),
        other => Err(ConfigError::Invalid(format!("invalid value '{}' for {} (expected 0 or 1)", other, name))),
    }
}
