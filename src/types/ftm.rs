use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::SimTime;

/// Largest value the FTMs-per-burst field can carry
pub const MAX_FTMS_PER_BURST: u32 = 31;

#[derive(Debug, Error, PartialEq)]
pub enum FtmParamsError {
    #[error("Burst exponent {0} is out of range (0 - 15)")]
    BurstExponentOutOfRange(u8),
    #[error("Burst duration code {0} is reserved (use 2 - 11 or 15)")]
    ReservedBurstDuration(u8),
    #[error("FTMs per burst must be at least 1")]
    NoFramesPerBurst,
    #[error("FTMs per burst {0} exceeds the 5-bit field (at most {max})", max = MAX_FTMS_PER_BURST)]
    TooManyFramesPerBurst(u32),
    #[error("Min delta FTM must be at least 1 (100 µs units)")]
    ZeroMinDeltaFtm,
    #[error("Burst period must be at least 1 (100 ms units)")]
    ZeroBurstPeriod,
}

/// Status indication field carried by the initial FTM frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusIndication {
    Reserved,
    Successful,
    RequestIncapable,
    Failed,
}

impl StatusIndication {
    pub fn code(&self) -> u8 {
        match self {
            StatusIndication::Reserved => 0,
            StatusIndication::Successful => 1,
            StatusIndication::RequestIncapable => 2,
            StatusIndication::Failed => 3,
        }
    }
}

/// Timing and structure of one ranging session.
///
/// Field units follow the FTM parameters element: `burst_duration` is an encoded
/// exponent, `min_delta_ftm` counts 100 µs and `burst_period` counts 100 ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtmParams {
    pub status_indication: StatusIndication,
    pub status_indication_value: u8,
    pub number_of_bursts_exponent: u8,
    pub burst_duration: u8,
    pub min_delta_ftm: u32,
    pub partial_tsf_timer: u16,
    pub partial_tsf_no_pref: bool,
    pub asap_capable: bool,
    pub asap: bool,
    pub ftms_per_burst: u32,
    pub format_and_bandwidth: u8,
    pub burst_period: u16,
}

impl Default for FtmParams {
    fn default() -> Self {
        Self {
            status_indication: StatusIndication::Reserved,
            status_indication_value: 0,
            number_of_bursts_exponent: 1,
            burst_duration: 11,
            min_delta_ftm: 640,
            partial_tsf_timer: 0,
            partial_tsf_no_pref: true,
            asap_capable: false,
            asap: true,
            ftms_per_burst: 2,
            format_and_bandwidth: 0,
            burst_period: 1,
        }
    }
}

impl FtmParams {
    pub fn validate(&self) -> Result<(), FtmParamsError> {
        if self.number_of_bursts_exponent > 15 {
            return Err(FtmParamsError::BurstExponentOutOfRange(self.number_of_bursts_exponent));
        }
        self.burst_duration_time()?;
        if self.ftms_per_burst == 0 {
            return Err(FtmParamsError::NoFramesPerBurst);
        }
        if self.ftms_per_burst > MAX_FTMS_PER_BURST {
            return Err(FtmParamsError::TooManyFramesPerBurst(self.ftms_per_burst));
        }
        if self.min_delta_ftm == 0 {
            return Err(FtmParamsError::ZeroMinDeltaFtm);
        }
        if self.burst_period == 0 {
            return Err(FtmParamsError::ZeroBurstPeriod);
        }
        Ok(())
    }

    /// Number of bursts in the session, `2^exponent`
    pub fn number_of_bursts(&self) -> u64 {
        1u64 << self.number_of_bursts_exponent.min(15)
    }

    /// Measurements a session produces when every frame fits its burst window
    pub fn expected_measurements(&self) -> u64 {
        self.number_of_bursts() * self.ftms_per_burst as u64
    }

    /// Decodes the burst duration field: 2 is 250 µs and every step doubles, up to 11 (128 ms).
    /// 15 means "no preference" and is granted the longest window.
    pub fn burst_duration_time(&self) -> Result<SimTime, FtmParamsError> {
        match self.burst_duration {
            code @ 2..=11 => Ok(SimTime::from_micros(250) * (1u64 << (code - 2))),
            15 => Ok(SimTime::from_millis(128)),
            code => Err(FtmParamsError::ReservedBurstDuration(code)),
        }
    }

    pub fn min_delta_ftm_time(&self) -> SimTime {
        SimTime::from_micros(100) * self.min_delta_ftm as u64
    }

    pub fn burst_period_time(&self) -> SimTime {
        SimTime::from_millis(100) * self.burst_period as u64
    }
}

impl fmt::Display for FtmParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status_indication={}({}) bursts_exponent={} burst_duration={} min_delta_ftm={} \
             partial_tsf_timer={} partial_tsf_no_pref={} asap_capable={} asap={} \
             ftms_per_burst={} format_and_bandwidth={} burst_period={}",
            self.status_indication.code(),
            self.status_indication_value,
            self.number_of_bursts_exponent,
            self.burst_duration,
            self.min_delta_ftm,
            self.partial_tsf_timer,
            self.partial_tsf_no_pref as u8,
            self.asap_capable as u8,
            self.asap as u8,
            self.ftms_per_burst,
            self.format_and_bandwidth,
            self.burst_period,
        )
    }
}

/// Lifecycle of a ranging session; single-shot, no cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Configured,
    Scheduled,
    Running,
    Completed,
    Failed,
}

/// Results of a completed ranging session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStatistics {
    /// Mean round-trip time in picoseconds
    pub mean_rtt_ps: f64,
    /// Round-trip time of every measurement, in picoseconds
    pub individual_rtt_ps: Vec<f64>,
    /// Mean received signal strength in dBm
    pub mean_signal_strength_dbm: f64,
    /// Received signal strength of every measurement, in dBm
    pub individual_signal_strength_dbm: Vec<f64>,
}

impl SessionStatistics {
    pub fn from_samples(rtt_ps: Vec<f64>, signal_strength_dbm: Vec<f64>) -> Self {
        Self {
            mean_rtt_ps: mean(&rtt_ps),
            mean_signal_strength_dbm: mean(&signal_strength_dbm),
            individual_rtt_ps: rtt_ps,
            individual_signal_strength_dbm: signal_strength_dbm,
        }
    }

    pub fn measurement_count(&self) -> usize {
        self.individual_rtt_ps.len()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
