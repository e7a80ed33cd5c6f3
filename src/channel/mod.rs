//! Radio channel between a station and the anchor.
//!
//! Received power is the transmit power plus the receiver gain minus the loss
//! reported by the configured propagation model on the configured band.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::constants::DEFAULT_TX_POWER_DBM;

pub mod nakagami;
pub mod three_gpp;

pub use nakagami::NakagamiLoss;
pub use three_gpp::ThreeGppIndoorOffice;


/// Loss models never see distances shorter than this, in metres
pub const MIN_DISTANCE_M: f64 = 1.0;

#[derive(Debug, Error, PartialEq)]
pub enum ChannelError {
    #[error("Unknown frequency band code: {0} (expected 0 for 2.4 GHz or 1 for 5 GHz)")]
    UnknownFrequencyBand(u8),
    #[error("Unknown propagation loss model code: {0} (expected 0 for 3GPP indoor office or 1 for Nakagami)")]
    UnknownLossModel(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyBand {
    Band2_4GHz,
    Band5GHz,
}

impl FrequencyBand {
    pub fn code(&self) -> u8 {
        match self {
            FrequencyBand::Band2_4GHz => 0,
            FrequencyBand::Band5GHz => 1,
        }
    }

    /// Carrier frequency used for loss computations
    pub fn center_frequency_hz(&self) -> f64 {
        match self {
            FrequencyBand::Band2_4GHz => 2.437e9,
            FrequencyBand::Band5GHz => 5.18e9,
        }
    }
}

impl TryFrom<u8> for FrequencyBand {
    type Error = ChannelError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(FrequencyBand::Band2_4GHz),
            1 => Ok(FrequencyBand::Band5GHz),
            other => Err(ChannelError::UnknownFrequencyBand(other)),
        }
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyBand::Band2_4GHz => write!(f, "2.4 GHz"),
            FrequencyBand::Band5GHz => write!(f, "5 GHz"),
        }
    }
}

/// A propagation loss model
pub trait PropagationLoss: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Path loss in dB over `distance_m` at `frequency_hz`
    fn loss_db(&self, distance_m: f64, frequency_hz: f64, rng: &mut dyn RngCore) -> f64;
}

/// Selectable loss models, by operator code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossModelKind {
    ThreeGppIndoorOffice,
    Nakagami,
}

impl LossModelKind {
    pub fn code(&self) -> u8 {
        match self {
            LossModelKind::ThreeGppIndoorOffice => 0,
            LossModelKind::Nakagami => 1,
        }
    }

    pub fn build(&self) -> Box<dyn PropagationLoss> {
        match self {
            LossModelKind::ThreeGppIndoorOffice => Box::new(ThreeGppIndoorOffice),
            LossModelKind::Nakagami => Box::new(NakagamiLoss::default()),
        }
    }
}

impl TryFrom<u8> for LossModelKind {
    type Error = ChannelError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(LossModelKind::ThreeGppIndoorOffice),
            1 => Ok(LossModelKind::Nakagami),
            other => Err(ChannelError::UnknownLossModel(other)),
        }
    }
}

impl fmt::Display for LossModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossModelKind::ThreeGppIndoorOffice => write!(f, "3GPP indoor office"),
            LossModelKind::Nakagami => write!(f, "Nakagami"),
        }
    }
}

/// The channel every link of an experiment shares
#[derive(Debug)]
pub struct ChannelModel {
    band: FrequencyBand,
    loss: Box<dyn PropagationLoss>,
    rx_gain_db: f64,
    tx_power_dbm: f64,
}

impl ChannelModel {
    pub fn new(band: FrequencyBand, loss: LossModelKind, rx_gain_db: f64) -> Self {
        Self {
            band,
            loss: loss.build(),
            rx_gain_db,
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
        }
    }

    pub fn band(&self) -> FrequencyBand {
        self.band
    }

    pub fn rx_gain_db(&self) -> f64 {
        self.rx_gain_db
    }

    pub fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    pub fn loss_model_name(&self) -> &'static str {
        self.loss.name()
    }

    /// Received signal strength over a link of `distance_m`
    pub fn rx_power_dbm(&self, distance_m: f64, rng: &mut dyn RngCore) -> f64 {
        let distance = distance_m.max(MIN_DISTANCE_M);
        let loss = self.loss.loss_db(distance, self.band.center_frequency_hz(), rng);
        self.tx_power_dbm + self.rx_gain_db - loss
    }
}
