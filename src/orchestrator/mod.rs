//! Experiment driver.
//!
//! `Experiment::setup` validates the configuration, places the stations, numbers
//! every interface and installs the neighbor table. `launch_sessions` opens and
//! schedules one ranging session per station, and `run` drives the timeline to
//! its stop time and collects what completed.
//!
//! Configuration problems are reported as [`ExperimentError::Config`] before
//! anything is scheduled. Broken preconditions (a node without a network layer,
//! ranging disabled on a MAC) end the run with [`ExperimentError::Fatal`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::channel::{ChannelError, ChannelModel};
use crate::error_model::{select_error_model, ChannelBandwidth, ErrorMap, ErrorModelError};
use crate::ftm::{FtmSession, SessionError, SessionReport};
use crate::geometry::place;
use crate::neighbor::{self, NeighborError, NeighborTable};
use crate::scheduler::{RunOutcome, Scheduler};
use crate::topology::{Topology, TopologyError};
use crate::trace::{FrameRecord, TraceError, TraceWriter};
use crate::types::constants::{DEFAULT_NETWORK_BASE, DEFAULT_NETWORK_PREFIX};
use crate::types::ftm::FtmParamsError;
use crate::types::{NodeId, Position, SessionState, SimTime};

pub mod config;
pub mod report;

pub use config::{ErrorMapSource, ExperimentConfig, StartMode};
pub use report::{ExperimentReport, NodeListing, SessionHandle, SetupEcho};


// ------------------------------------------------------------------------------------------------
// Errors
// ------------------------------------------------------------------------------------------------

/// Problems with the operator's configuration, found before any session is scheduled
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    ErrorModel(#[from] ErrorModelError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Params(#[from] FtmParamsError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Broken preconditions; the run cannot continue
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Neighbor(#[from] NeighborError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("FTM is not enabled on the MAC of {0}")]
    FtmDisabled(NodeId),
    #[error("A session was already launched for {0}")]
    SessionAlreadyLaunched(NodeId),
    #[error("No session exists for {0}")]
    UnknownSession(NodeId),
    #[error("Failed to write frame trace: {0}")]
    TraceWrite(TraceError),
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Fatal: {0}")]
    Fatal(#[from] FatalError),
}

impl ExperimentError {
    pub fn is_config(&self) -> bool {
        matches!(self, ExperimentError::Config(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ExperimentError::Fatal(_))
    }
}

// ------------------------------------------------------------------------------------------------
// Events
// ------------------------------------------------------------------------------------------------

/// Events on the experiment timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentEvent {
    SessionBegin(NodeId),
    FtmFrame { station: NodeId, burst: u64, frame: u32 },
    SessionOver(NodeId),
}

// ------------------------------------------------------------------------------------------------
// Experiment
// ------------------------------------------------------------------------------------------------

pub struct Experiment {
    config: ExperimentConfig,
    bandwidth: ChannelBandwidth,
    topology: Topology,
    neighbor_table: Arc<NeighborTable>,
    error_map: Arc<ErrorMap>,
    channel: ChannelModel,
    scheduler: Scheduler<ExperimentEvent>,
    sessions: BTreeMap<NodeId, FtmSession>,
    session_starts: Vec<(NodeId, SimTime)>,
    rng: StdRng,
    trace: Option<TraceWriter>,
    transcript: Vec<String>,
}

impl Experiment {
    /// Validates `config` and builds the topology and the shared neighbor table
    pub fn setup(config: ExperimentConfig) -> Result<Self, ExperimentError> {
        let topology = Self::build_topology(&config)?;
        Self::with_topology(config, topology)
    }

    /// Places the anchor at the origin and every station around it
    pub fn build_topology(config: &ExperimentConfig) -> Result<Topology, ExperimentError> {
        let mut topology = Topology::new();
        topology.add_anchor().map_err(FatalError::from)?;
        for index in 0..config.stations {
            let position = place(index, config.stations, config.layout, config.distance);
            topology.add_station(position).map_err(FatalError::from)?;
        }
        topology.install_internet_stack_all();
        Ok(topology)
    }

    /// Like [`Experiment::setup`], on a topology the caller has built or altered
    pub fn with_topology(config: ExperimentConfig, mut topology: Topology) -> Result<Self, ExperimentError> {
        config.validate()?;
        let band = config.frequency_band()?;
        let loss = config.loss_model()?;
        let bandwidth = config.bandwidth()?;
        let error_map = Arc::new(config.error_map.resolve(config.seed)?);
        let trace = match &config.trace_path {
            Some(prefix) => Some(TraceWriter::create(prefix).map_err(ConfigError::from)?),
            None => None,
        };

        topology
            .assign_addresses(DEFAULT_NETWORK_BASE, DEFAULT_NETWORK_PREFIX)
            .map_err(FatalError::from)?;
        let neighbor_table = neighbor::build_and_install(&mut topology).map_err(FatalError::from)?;

        let channel = ChannelModel::new(band, loss, config.rx_gain_db);
        let mut experiment = Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            bandwidth,
            topology,
            neighbor_table,
            error_map,
            channel,
            scheduler: Scheduler::new(),
            sessions: BTreeMap::new(),
            session_starts: Vec::new(),
            trace,
            transcript: Vec::new(),
        };
        experiment.echo_setup();
        Ok(experiment)
    }

    fn emit(&mut self, line: String) {
        if self.config.echo {
            println!("{}", line);
        }
        self.transcript.push(line);
    }

    fn echo_setup(&mut self) {
        let setup = self.setup_echo();
        self.emit(format!("Frequency:              {}", setup.frequency));
        self.emit(format!("Rx Gain:                {}", setup.rx_gain_db));
        self.emit(format!("Propagation Loss Model: {}", self.channel.loss_model_name()));

        let listings = self.node_listings();
        if let Some(address) = listings.first().and_then(|anchor| anchor.ipv4) {
            self.emit(format!("AP address: {}", address));
        }
        for (number, listing) in listings.iter().skip(1).enumerate() {
            self.emit(format!("Station {}: {}", number + 1, listing.position));
        }
        for (number, listing) in listings.iter().skip(1).enumerate() {
            if let Some(address) = listing.ipv4 {
                self.emit(format!("Station {} address: {}", number + 1, address));
            }
        }
        self.emit(format!("Number of stations:     {}", setup.stations));
        self.emit(format!("Channel bandwidth:      {} MHz", setup.bandwidth.mhz()));
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn neighbor_table(&self) -> &Arc<NeighborTable> {
        &self.neighbor_table
    }

    pub fn error_map(&self) -> &Arc<ErrorMap> {
        &self.error_map
    }

    /// Stations and the times their sessions were scheduled for, in registration order
    pub fn session_starts(&self) -> &[(NodeId, SimTime)] {
        &self.session_starts
    }

    pub fn session_state(&self, station: NodeId) -> Option<SessionState> {
        self.sessions.get(&station).map(|session| session.state())
    }

    /// Number of events waiting on the timeline
    pub fn pending_events(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    fn setup_echo(&self) -> SetupEcho {
        SetupEcho {
            frequency: self.channel.band(),
            rx_gain_db: self.channel.rx_gain_db(),
            loss_model: self.channel.loss_model_name().to_string(),
            stations: self.config.stations,
            bandwidth: self.bandwidth,
        }
    }

    fn node_listings(&self) -> Vec<NodeListing> {
        self.topology
            .nodes()
            .iter()
            .map(|node| NodeListing {
                id: node.id(),
                role: node.role(),
                position: node.position(),
                ipv4: node.primary_address(),
                mac: node.mac(),
            })
            .collect()
    }

    /// Launches one session per station, at the offsets the start mode gives.
    ///
    /// Every station is checked before the first session is scheduled, so a MAC
    /// with ranging disabled leaves the timeline empty.
    pub fn launch_sessions(&mut self) -> Result<Vec<SessionHandle>, ExperimentError> {
        let stations: Vec<NodeId> = self.topology.stations().map(|node| node.id()).collect();
        for node in self.topology.stations() {
            if !node.device().ftm_enabled() {
                return Err(FatalError::FtmDisabled(node.id()).into());
            }
        }

        let offsets = self.config.start_offsets();
        stations
            .into_iter()
            .zip(offsets)
            .map(|(station, offset)| self.launch_session(station, offset))
            .collect()
    }

    /// Opens a session from `station` towards the anchor and schedules its start at `start_offset`
    pub fn launch_session(&mut self, station: NodeId, start_offset: SimTime) -> Result<SessionHandle, ExperimentError> {
        if self.sessions.contains_key(&station) {
            return Err(FatalError::SessionAlreadyLaunched(station).into());
        }
        let anchor_mac = self.topology.anchor().map_err(FatalError::from)?.mac();
        let node = self.topology.node(station).map_err(FatalError::from)?;

        let mut session = node
            .device()
            .new_ftm_session(station, anchor_mac)
            .ok_or(FatalError::FtmDisabled(station))?;
        session.set_params(self.config.ftm.clone());
        let binding = select_error_model(self.bandwidth.mhz(), node, &self.error_map).map_err(ConfigError::from)?;
        session.set_error_model(binding);

        let (sender, receiver) = oneshot::channel();
        session.set_completion(sender);
        session.mark_scheduled().map_err(FatalError::from)?;

        self.scheduler.schedule_at(start_offset, ExperimentEvent::SessionBegin(station));
        self.sessions.insert(station, session);
        self.session_starts.push((station, start_offset));
        tracing::info!("Scheduled session for {} at {}", station, start_offset);

        Ok(SessionHandle::new(station, start_offset, receiver))
    }

    /// Drives the timeline until it drains or reaches the stop time
    pub fn run(mut self) -> Result<ExperimentReport, ExperimentError> {
        let stop_time = self.config.stop_time();
        self.scheduler.stop(stop_time);

        let anchor_position = self.topology.anchor().map_err(FatalError::from)?.position();
        let positions: BTreeMap<NodeId, Position> = self
            .topology
            .stations()
            .map(|node| (node.id(), node.position()))
            .collect();

        let mut completed: Vec<SessionReport> = Vec::new();
        let mut lines: Vec<String> = Vec::new();
        let echo = self.config.echo;

        let Experiment { scheduler, sessions, channel, rng, trace, .. } = &mut self;
        let outcome = scheduler.run(|scheduler, event| -> Result<(), ExperimentError> {
            match event {
                ExperimentEvent::SessionBegin(station) => {
                    let session = sessions.get_mut(&station).ok_or(FatalError::UnknownSession(station))?;
                    let plan = session.begin(scheduler.now()).map_err(FatalError::from)?;
                    tracing::info!(
                        "Session for {} running: {} frames, ends at {}",
                        station,
                        plan.frames.len(),
                        plan.ends_at
                    );
                    for frame in plan.frames {
                        scheduler.schedule_at(
                            frame.at,
                            ExperimentEvent::FtmFrame { station, burst: frame.burst, frame: frame.frame },
                        );
                    }
                    scheduler.schedule_at(plan.ends_at, ExperimentEvent::SessionOver(station));
                }
                ExperimentEvent::FtmFrame { station, burst, frame } => {
                    let session = sessions.get_mut(&station).ok_or(FatalError::UnknownSession(station))?;
                    let position = positions.get(&station).ok_or(FatalError::UnknownSession(station))?;
                    let distance = position.distance_to(&anchor_position);
                    let measurement = session.measure(distance, channel, &mut *rng).map_err(FatalError::from)?;
                    tracing::debug!(
                        "{} burst {} frame {}: rtt {:.1} ps, rssi {:.2} dBm",
                        station,
                        burst,
                        frame,
                        measurement.rtt_ps,
                        measurement.rssi_dbm
                    );
                    if let Some(writer) = trace.as_mut() {
                        let record = FrameRecord::new(
                            scheduler.now(),
                            station,
                            burst,
                            frame,
                            measurement.rtt_ps,
                            measurement.rssi_dbm,
                        );
                        writer.write(&record).map_err(FatalError::TraceWrite)?;
                    }
                }
                ExperimentEvent::SessionOver(station) => {
                    let session = sessions.get_mut(&station).ok_or(FatalError::UnknownSession(station))?;
                    let report = session.complete(scheduler.now()).map_err(FatalError::from)?;
                    tracing::info!(
                        "Session for {} completed with {} measurements",
                        station,
                        report.statistics.measurement_count()
                    );
                    for line in report.to_string().lines() {
                        if echo {
                            println!("{}", line);
                        }
                        lines.push(line.to_string());
                    }
                    completed.push(report);
                }
            }
            Ok(())
        })?;

        if let RunOutcome::Stopped { pending } = outcome {
            tracing::info!("Stopped at {} with {} events left", stop_time, pending);
        }

        let mut incomplete = Vec::new();
        for (station, session) in self.sessions.iter_mut() {
            if session.state() != SessionState::Completed {
                session.fail();
                incomplete.push(*station);
            }
        }
        if let Some(writer) = self.trace.as_mut() {
            writer.flush().map_err(FatalError::TraceWrite)?;
        }
        self.transcript.extend(lines);

        Ok(ExperimentReport {
            setup: self.setup_echo(),
            nodes: self.node_listings(),
            completed,
            incomplete,
            stop_time,
            finished_at: self.scheduler.now(),
            transcript: self.transcript,
        })
    }
}

/// Sets up, launches every session and runs one experiment
pub fn run_experiment(config: ExperimentConfig) -> Result<ExperimentReport, ExperimentError> {
    let mut experiment = Experiment::setup(config)?;
    experiment.launch_sessions()?;
    experiment.run()
}
