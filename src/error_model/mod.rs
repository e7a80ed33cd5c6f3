//! Ranging error models.
//!
//! A station's measurements are perturbed by a model chosen from the channel
//! bandwidth class and bound to a spatial error map. The map is loaded once per
//! experiment and shared read-only by every binding.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::topology::Node;
use crate::types::{NodeId, Position};

pub mod map;
pub use map::ErrorMap;


/// Signal strength below which the timing noise starts to widen
const WEAK_SIGNAL_DBM: f64 = -70.0;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum ErrorModelError {
    #[error("Unsupported channel bandwidth: {0} MHz (expected 20, 40, 80 or 160)")]
    UnsupportedBandwidth(u32),
    #[error("Failed to read error map {path}: {source}")]
    MapRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse error map {path}: {source}")]
    MapParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid error map: {0}")]
    InvalidMap(String),
}

/// Channel bandwidth classes FTM can range over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ChannelBandwidth {
    Mhz20,
    Mhz40,
    Mhz80,
    Mhz160,
}

impl ChannelBandwidth {
    pub const ALL: [ChannelBandwidth; 4] = [
        ChannelBandwidth::Mhz20,
        ChannelBandwidth::Mhz40,
        ChannelBandwidth::Mhz80,
        ChannelBandwidth::Mhz160,
    ];

    pub fn mhz(&self) -> u32 {
        match self {
            ChannelBandwidth::Mhz20 => 20,
            ChannelBandwidth::Mhz40 => 40,
            ChannelBandwidth::Mhz80 => 80,
            ChannelBandwidth::Mhz160 => 160,
        }
    }

    /// Standard deviation of the timing error on a strong link, in picoseconds.
    /// Halves with every doubling of bandwidth.
    pub fn base_sigma_ps(&self) -> f64 {
        60_000.0 / self.mhz() as f64
    }
}

impl TryFrom<u32> for ChannelBandwidth {
    type Error = ErrorModelError;

    fn try_from(mhz: u32) -> Result<Self, Self::Error> {
        match mhz {
            20 => Ok(ChannelBandwidth::Mhz20),
            40 => Ok(ChannelBandwidth::Mhz40),
            80 => Ok(ChannelBandwidth::Mhz80),
            160 => Ok(ChannelBandwidth::Mhz160),
            other => Err(ErrorModelError::UnsupportedBandwidth(other)),
        }
    }
}

impl From<ChannelBandwidth> for u32 {
    fn from(bandwidth: ChannelBandwidth) -> u32 {
        bandwidth.mhz()
    }
}

impl fmt::Display for ChannelBandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.mhz())
    }
}

/// A signal-strength aware error model bound to one station.
///
/// The perturbed round-trip time is the ideal one, plus the multipath bias the
/// map holds at the station's position, plus Gaussian noise whose spread is set
/// by the bandwidth class and grows as the link weakens.
#[derive(Debug, Clone)]
pub struct ErrorModelBinding {
    instance: u64,
    station: NodeId,
    position: Position,
    bandwidth: ChannelBandwidth,
    map: Arc<ErrorMap>,
}

impl ErrorModelBinding {
    /// Identity of this model instance; unique within the process
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn station(&self) -> NodeId {
        self.station
    }

    pub fn bandwidth(&self) -> ChannelBandwidth {
        self.bandwidth
    }

    pub fn map(&self) -> &Arc<ErrorMap> {
        &self.map
    }

    /// Noise spread for a measurement received at `rssi_dbm`
    pub fn sigma_ps(&self, rssi_dbm: f64) -> f64 {
        let base = self.bandwidth.base_sigma_ps();
        if rssi_dbm < WEAK_SIGNAL_DBM {
            base * (1.0 + (WEAK_SIGNAL_DBM - rssi_dbm) / 10.0)
        } else {
            base
        }
    }

    /// Applies the model to one ideal round-trip time. The result is never negative.
    pub fn perturb_rtt<R: Rng + ?Sized>(&self, ideal_rtt_ps: f64, rssi_dbm: f64, rng: &mut R) -> f64 {
        let bias = self.map.bias_at(&self.position);
        let noise = Normal::new(0.0, self.sigma_ps(rssi_dbm))
            .map(|normal| normal.sample(rng))
            .unwrap_or(0.0);
        (ideal_rtt_ps + bias + noise).max(0.0)
    }
}

/// Binds a fresh error model for `station` to the shared map.
///
/// Only the bandwidth classes 20, 40, 80 and 160 MHz are accepted.
pub fn select_error_model(
    bandwidth_mhz: u32,
    station: &Node,
    map: &Arc<ErrorMap>,
) -> Result<ErrorModelBinding, ErrorModelError> {
    let bandwidth = ChannelBandwidth::try_from(bandwidth_mhz)?;
    let binding = ErrorModelBinding {
        instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        station: station.id(),
        position: station.position(),
        bandwidth,
        map: Arc::clone(map),
    };
    tracing::debug!(
        "Bound error model #{} ({}) to station {}",
        binding.instance,
        bandwidth,
        binding.station
    );
    Ok(binding)
}
