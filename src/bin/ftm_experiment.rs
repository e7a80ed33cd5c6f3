//! Runs one FTM ranging experiment and prints the setup and every session summary.

use std::path::PathBuf;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use ftm_ranging::orchestrator::{ErrorMapSource, Experiment, ExperimentConfig, StartMode};
use ftm_ranging::types::FtmParams;
use ftm_ranging::utils::logging;
use ftm_ranging::Layout;

#[derive(Parser, Debug)]
#[command(name = "ftm_experiment")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of bursts is 2^exponent
    #[arg(long = "numberOfBurstsExponent", default_value_t = 1)]
    number_of_bursts_exponent: u8,

    /// Burst duration code, 2 (250 us) to 11 (128 ms), or 15 for no preference
    #[arg(long = "burstDuration", default_value_t = 11)]
    burst_duration: u8,

    /// Spacing between FTM frames in a burst, in 100 us units
    #[arg(long = "minDeltaFtm", default_value_t = 640)]
    min_delta_ftm: u32,

    #[arg(long = "partialTsfTimer", default_value_t = 0)]
    partial_tsf_timer: u16,

    #[arg(long = "partialTsfNoPref", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    partial_tsf_no_pref: bool,

    #[arg(long = "asapCapable", default_value_t = false, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    asap_capable: bool,

    #[arg(long = "asap", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    asap: bool,

    #[arg(long = "ftmsPerBurst", default_value_t = 2)]
    ftms_per_burst: u32,

    #[arg(long = "formatAndBandwidth", default_value_t = 0)]
    format_and_bandwidth: u8,

    /// Burst period in 100 ms units
    #[arg(long = "burstPeriod", default_value_t = 1)]
    burst_period: u16,

    /// 2.4 GHz (0) or 5 GHz (1)
    #[arg(long = "frequency", default_value_t = 1)]
    frequency: u8,

    /// Receiver gain in dB
    #[arg(long = "rxGain", default_value_t = 0.0)]
    rx_gain: f64,

    /// ThreeGppIndoorOffice (0) or Nakagami (1)
    #[arg(long = "propagationLossModel", default_value_t = 0)]
    propagation_loss_model: u8,

    #[arg(long = "numberOfStations", default_value_t = 1)]
    number_of_stations: usize,

    /// 20, 40, 80 or 160 MHz
    #[arg(long = "channelBandwidth", default_value_t = 20)]
    channel_bandwidth: u32,

    /// Station spacing in metres
    #[arg(long = "distance", default_value_t = 5.0)]
    distance: f64,

    /// circle or quadrant-chain
    #[arg(long = "layout", default_value = "circle")]
    layout: Layout,

    /// Start every session at time zero instead of staggering them
    #[arg(long = "immediate")]
    immediate: bool,

    /// Seconds between staggered session starts
    #[arg(long = "interSessionGap", default_value_t = 200.0)]
    inter_session_gap: f64,

    /// Simulated stop time in seconds (default: 100 s after the last start)
    #[arg(long = "stopTime")]
    stop_time: Option<f64>,

    /// JSON error map file; a synthetic 50x50 map is used when omitted
    #[arg(long = "errorMap", value_name = "FILE")]
    error_map: Option<PathBuf>,

    /// Frame trace prefix, written to <prefix>.jsonl
    #[arg(long = "tracePath", alias = "pcapPath", value_name = "PREFIX")]
    trace_path: Option<PathBuf>,

    #[arg(long = "seed", alias = "RngRun", default_value_t = 1)]
    seed: u64,
}

impl Args {
    fn into_config(self) -> ExperimentConfig {
        let ftm = FtmParams {
            number_of_bursts_exponent: self.number_of_bursts_exponent,
            burst_duration: self.burst_duration,
            min_delta_ftm: self.min_delta_ftm,
            partial_tsf_timer: self.partial_tsf_timer,
            partial_tsf_no_pref: self.partial_tsf_no_pref,
            asap_capable: self.asap_capable,
            asap: self.asap,
            ftms_per_burst: self.ftms_per_burst,
            format_and_bandwidth: self.format_and_bandwidth,
            burst_period: self.burst_period,
            ..FtmParams::default()
        };
        let start_mode = if self.immediate {
            StartMode::Immediate
        } else {
            StartMode::Staggered {
                gap_secs: self.inter_session_gap,
            }
        };
        ExperimentConfig {
            ftm,
            frequency: self.frequency,
            rx_gain_db: self.rx_gain,
            propagation_loss_model: self.propagation_loss_model,
            stations: self.number_of_stations,
            channel_bandwidth_mhz: self.channel_bandwidth,
            distance: self.distance,
            layout: self.layout,
            start_mode,
            stop_secs: self.stop_time,
            error_map: self.error_map.map(ErrorMapSource::File).unwrap_or_default(),
            trace_path: self.trace_path,
            seed: self.seed,
            echo: true,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let config = Args::parse().into_config();

    let mut experiment = Experiment::setup(config).context("Experiment setup failed")?;
    let handles = experiment.launch_sessions().context("Failed to launch ranging sessions")?;
    let report = experiment.run().context("Experiment run failed")?;

    let outcomes = futures::future::join_all(handles.into_iter().map(|handle| handle.completion())).await;
    let completed = outcomes.iter().filter(|outcome| outcome.is_some()).count();
    tracing::info!("{} of {} sessions completed", completed, outcomes.len());
    for station in &report.incomplete {
        eprintln!("Session for {} did not complete before {}", station, report.stop_time);
    }
    Ok(())
}
