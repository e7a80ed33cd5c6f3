//! Fine Timing Measurement sessions.
//!
//! A session is opened by a station's MAC towards the anchor, configured with a
//! parameter bundle and an error model, and then driven by the orchestrator:
//! it is scheduled once, runs its bursts, and completes or fails exactly once.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::channel::ChannelModel;
use crate::error_model::ErrorModelBinding;
use crate::types::constants::SPEED_OF_LIGHT_M_PER_S;
use crate::types::ftm::FtmParamsError;
use crate::types::{FtmParams, MacAddress, NodeId, SessionState, SessionStatistics, SimTime};

#[cfg(test)]
mod tests;

/// Time taken by the initial request and its acknowledgement
pub const NEGOTIATION_TIME: SimTime = SimTime::from_micros(200);

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Session for {station} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        station: NodeId,
        from: SessionState,
        to: SessionState,
    },
    #[error("Session for {0} has no error model attached")]
    MissingErrorModel(NodeId),
    #[error("Invalid FTM parameters: {0}")]
    InvalidParams(#[from] FtmParamsError),
}

/// One FTM frame the session expects to exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedFrame {
    pub at: SimTime,
    pub burst: u64,
    pub frame: u32,
}

/// Frame timeline of a started session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub frames: Vec<PlannedFrame>,
    /// End of the last burst window; the session completes here
    pub ends_at: SimTime,
    /// Frames that fell outside their burst window
    pub dropped: usize,
}

/// A single measurement taken from one FTM frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub rtt_ps: f64,
    pub rssi_dbm: f64,
}

/// Everything a completed session reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub station: NodeId,
    pub initiator: MacAddress,
    pub responder: MacAddress,
    pub params: FtmParams,
    pub started_at: SimTime,
    pub completed_at: SimTime,
    pub statistics: SessionStatistics,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FTM params: {}", self.params)?;
        writeln!(f, "Mean RTT [ps]: {}", self.statistics.mean_rtt_ps)?;
        writeln!(f, "Mean Signal Strength [dBm]: {}", self.statistics.mean_signal_strength_dbm)?;
        write!(f, "Number of Measurements: {}", self.statistics.measurement_count())
    }
}

/// Ideal round-trip time over `distance_m`, in picoseconds
pub fn ideal_rtt_ps(distance_m: f64) -> f64 {
    2.0 * distance_m / SPEED_OF_LIGHT_M_PER_S * SimTime::PICOS_PER_SEC as f64
}

#[derive(Debug)]
pub struct FtmSession {
    owner: NodeId,
    initiator: MacAddress,
    responder: MacAddress,
    state: SessionState,
    params: FtmParams,
    error_model: Option<ErrorModelBinding>,
    started_at: Option<SimTime>,
    rtt_ps: Vec<f64>,
    rssi_dbm: Vec<f64>,
    completion: Option<oneshot::Sender<SessionReport>>,
}

impl FtmSession {
    pub fn new(owner: NodeId, initiator: MacAddress, responder: MacAddress) -> Self {
        Self {
            owner,
            initiator,
            responder,
            state: SessionState::Configured,
            params: FtmParams::default(),
            error_model: None,
            started_at: None,
            rtt_ps: Vec::new(),
            rssi_dbm: Vec::new(),
            completion: None,
        }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn initiator(&self) -> MacAddress {
        self.initiator
    }

    pub fn responder(&self) -> MacAddress {
        self.responder
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn params(&self) -> &FtmParams {
        &self.params
    }

    pub fn error_model(&self) -> Option<&ErrorModelBinding> {
        self.error_model.as_ref()
    }

    pub fn set_params(&mut self, params: FtmParams) {
        self.params = params;
    }

    pub fn set_error_model(&mut self, binding: ErrorModelBinding) {
        self.error_model = Some(binding);
    }

    /// Registers the sender notified once, when the session completes
    pub fn set_completion(&mut self, sender: oneshot::Sender<SessionReport>) {
        self.completion = Some(sender);
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<(), SessionError> {
        if self.state != from {
            return Err(SessionError::InvalidTransition {
                station: self.owner,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Configured -> Scheduled. Parameters and the error model must be in place.
    pub fn mark_scheduled(&mut self) -> Result<(), SessionError> {
        self.params.validate()?;
        if self.error_model.is_none() {
            return Err(SessionError::MissingErrorModel(self.owner));
        }
        self.transition(SessionState::Configured, SessionState::Scheduled)
    }

    /// Scheduled -> Running, returning the frame timeline starting at `now`
    pub fn begin(&mut self, now: SimTime) -> Result<SessionPlan, SessionError> {
        let window = self.params.burst_duration_time()?;
        self.transition(SessionState::Scheduled, SessionState::Running)?;
        self.started_at = Some(now);

        let delta = self.params.min_delta_ftm_time();
        let period = self.params.burst_period_time();
        let burst_spacing = period.max(window);
        let mut first_burst = now.saturating_add(NEGOTIATION_TIME);
        if !self.params.asap {
            first_burst = first_burst.saturating_add(period);
        }

        let mut frames = Vec::new();
        let mut dropped = 0usize;
        let bursts = self.params.number_of_bursts();
        for burst in 0..bursts {
            let burst_start = first_burst.saturating_add(burst_spacing * burst);
            for frame in 0..self.params.ftms_per_burst {
                let offset = delta * frame as u64;
                if frame > 0 && offset >= window {
                    dropped += 1;
                    continue;
                }
                frames.push(PlannedFrame {
                    at: burst_start.saturating_add(offset),
                    burst,
                    frame,
                });
            }
        }
        if dropped > 0 {
            tracing::debug!(
                "Session {}: {} frames fall outside the {} burst window and are dropped",
                self.owner,
                dropped,
                window
            );
        }

        let last_burst = first_burst.saturating_add(burst_spacing * bursts.saturating_sub(1));
        Ok(SessionPlan {
            frames,
            ends_at: last_burst.saturating_add(window),
            dropped,
        })
    }

    /// Takes one measurement over a link of `distance_m` and records it
    pub fn measure(
        &mut self,
        distance_m: f64,
        channel: &ChannelModel,
        rng: &mut dyn RngCore,
    ) -> Result<Measurement, SessionError> {
        if self.state != SessionState::Running {
            return Err(SessionError::InvalidTransition {
                station: self.owner,
                from: self.state,
                to: SessionState::Running,
            });
        }
        let binding = self.error_model.as_ref().ok_or(SessionError::MissingErrorModel(self.owner))?;
        let rssi_dbm = channel.rx_power_dbm(distance_m, rng);
        let rtt_ps = binding.perturb_rtt(ideal_rtt_ps(distance_m), rssi_dbm, rng);
        self.rtt_ps.push(rtt_ps);
        self.rssi_dbm.push(rssi_dbm);
        Ok(Measurement { rtt_ps, rssi_dbm })
    }

    pub fn measurement_count(&self) -> usize {
        self.rtt_ps.len()
    }

    /// Running -> Completed. Builds the report and notifies the completion sender.
    pub fn complete(&mut self, now: SimTime) -> Result<SessionReport, SessionError> {
        self.transition(SessionState::Running, SessionState::Completed)?;
        let statistics = SessionStatistics::from_samples(
            std::mem::take(&mut self.rtt_ps),
            std::mem::take(&mut self.rssi_dbm),
        );
        let report = SessionReport {
            station: self.owner,
            initiator: self.initiator,
            responder: self.responder,
            params: self.params.clone(),
            started_at: self.started_at.unwrap_or(now),
            completed_at: now,
            statistics,
        };
        if let Some(sender) = self.completion.take() {
            if sender.send(report.clone()).is_err() {
                tracing::debug!("Nobody is waiting on the completion of {}", self.owner);
            }
        }
        Ok(report)
    }

    /// Moves a session that has not finished to Failed. The completion sender is dropped unfired.
    pub fn fail(&mut self) {
        if matches!(self.state, SessionState::Completed | SessionState::Failed) {
            return;
        }
        tracing::warn!("Session {} failed in state {:?}", self.owner, self.state);
        self.state = SessionState::Failed;
        self.completion = None;
    }
}
