use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tokio::sync::oneshot;

use crate::channel::FrequencyBand;
use crate::error_model::ChannelBandwidth;
use crate::ftm::SessionReport;
use crate::types::{MacAddress, NodeId, NodeRole, Position, SimTime};

/// Completion handle of one launched session
#[derive(Debug)]
pub struct SessionHandle {
    station: NodeId,
    start_offset: SimTime,
    receiver: oneshot::Receiver<SessionReport>,
}

impl SessionHandle {
    pub(crate) fn new(station: NodeId, start_offset: SimTime, receiver: oneshot::Receiver<SessionReport>) -> Self {
        Self {
            station,
            start_offset,
            receiver,
        }
    }

    pub fn station(&self) -> NodeId {
        self.station
    }

    pub fn start_offset(&self) -> SimTime {
        self.start_offset
    }

    /// Resolves with the report once the session completes, or `None` if it never does
    pub async fn completion(self) -> Option<SessionReport> {
        self.receiver.await.ok()
    }
}

/// The run parameters echoed at setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupEcho {
    pub frequency: FrequencyBand,
    pub rx_gain_db: f64,
    pub loss_model: String,
    pub stations: usize,
    pub bandwidth: ChannelBandwidth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeListing {
    pub id: NodeId,
    pub role: NodeRole,
    pub position: Position,
    pub ipv4: Option<Ipv4Addr>,
    pub mac: MacAddress,
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub setup: SetupEcho,
    pub nodes: Vec<NodeListing>,
    /// Completed sessions, in completion order
    pub completed: Vec<SessionReport>,
    /// Stations whose session had not completed by the stop time
    pub incomplete: Vec<NodeId>,
    pub stop_time: SimTime,
    pub finished_at: SimTime,
    /// Setup echo followed by every session summary, line by line
    pub transcript: Vec<String>,
}

impl ExperimentReport {
    pub fn session(&self, station: NodeId) -> Option<&SessionReport> {
        self.completed.iter().find(|report| report.station == station)
    }

    pub fn transcript_text(&self) -> String {
        let mut text = self.transcript.join("\n");
        text.push('\n');
        text
    }
}
