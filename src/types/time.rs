use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul};

/// A point (or span) on the simulated timeline, counted in picoseconds.
///
/// Picosecond resolution matches what FTM timestamps need; a `u64` of picoseconds
/// covers a little over 200 days, far beyond any single experiment.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    pub const PICOS_PER_MICRO: u64 = 1_000_000;
    pub const PICOS_PER_MILLI: u64 = 1_000_000_000;
    pub const PICOS_PER_SEC: u64 = 1_000_000_000_000;

    pub const fn from_picos(picos: u64) -> Self {
        Self(picos)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(Self::PICOS_PER_MICRO))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(Self::PICOS_PER_MILLI))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(Self::PICOS_PER_SEC))
    }

    /// Converts fractional seconds, saturating at the ends of the range
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs <= 0.0 || secs.is_nan() {
            return Self::ZERO;
        }
        let picos = secs * Self::PICOS_PER_SEC as f64;
        if picos >= u64::MAX as f64 {
            Self::MAX
        } else {
            Self(picos.round() as u64)
        }
    }

    pub const fn as_picos(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / Self::PICOS_PER_SEC as f64
    }

    pub const fn saturating_add(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(other.0))
    }

    pub const fn saturating_sub(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(other.0))
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, other: SimTime) -> SimTime {
        self.saturating_add(other)
    }
}

impl Mul<u64> for SimTime {
    type Output = SimTime;

    fn mul(self, factor: u64) -> SimTime {
        SimTime(self.0.saturating_mul(factor))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}s", self.as_secs_f64())
    }
}
