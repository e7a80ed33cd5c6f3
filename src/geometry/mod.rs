//! Station placement around the anchor.
//!
//! Placement is a pure function of `(index, total, layout, spacing)` so a topology
//! can be rebuilt bit-for-bit from its configuration.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::Position;

/// Coordinates closer to zero than this are reported as exactly zero
pub const SNAP_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Unknown layout: {0} (expected 'circle' or 'quadrant-chain')")]
    UnknownLayout(String),
}

/// Geometric strategy used to spread stations around the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Evenly spaced on a ring of radius `spacing`
    #[default]
    Circle,
    /// Four chains heading east, north, west and south, one `spacing` apart.
    ///
    /// Station `i` sits `(i div 4 + 1) * spacing` out, so the first ring is one
    /// spacing from the anchor rather than on top of it.
    QuadrantChain,
}

impl FromStr for Layout {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "circle" => Ok(Layout::Circle),
            "quadrant-chain" => Ok(Layout::QuadrantChain),
            other => Err(GeometryError::UnknownLayout(other.to_string())),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Circle => write!(f, "circle"),
            Layout::QuadrantChain => write!(f, "quadrant-chain"),
        }
    }
}

/// Position of station `index` out of `total`, relative to an anchor at the origin
pub fn place(index: usize, total: usize, layout: Layout, spacing: f64) -> Position {
    match layout {
        Layout::Circle => {
            let angle = 2.0 * PI * index as f64 / total.max(1) as f64;
            Position::new(snap(spacing * angle.cos()), snap(spacing * angle.sin()))
        }
        Layout::QuadrantChain => {
            // Ring 0 sits one spacing out so no station lands on the anchor
            let reach = spacing * (index / 4 + 1) as f64;
            match index % 4 {
                0 => Position::new(reach, 0.0),
                1 => Position::new(0.0, reach),
                2 => Position::new(-reach, 0.0),
                _ => Position::new(0.0, -reach),
            }
        }
    }
}

fn snap(value: f64) -> f64 {
    if value.abs() < SNAP_EPSILON {
        0.0
    } else {
        value
    }
}
