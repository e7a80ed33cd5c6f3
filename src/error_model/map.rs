use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ErrorModelError;
use crate::types::Position;

/// Spread of the synthetic multipath bias, in picoseconds
const SYNTHETIC_BIAS_SIGMA_PS: f64 = 500.0;

/// A grid of multipath biases centred on the anchor.
///
/// A `W x H` map with 1 m resolution covers `[-W/2, W/2] x [-H/2, H/2]` metres.
/// Cells are stored row by row from the most negative `y`. Positions outside the
/// grid read the nearest edge cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMap {
    width: u32,
    height: u32,
    resolution: f64,
    bias_ps: Vec<f64>,
}

impl ErrorMap {
    pub fn new(width: u32, height: u32, resolution: f64, bias_ps: Vec<f64>) -> Result<Self, ErrorModelError> {
        let map = Self { width, height, resolution, bias_ps };
        map.validate()?;
        Ok(map)
    }

    /// Loads a JSON map file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ErrorModelError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ErrorModelError::MapRead {
            path: path.to_path_buf(),
            source,
        })?;
        let map: ErrorMap = serde_json::from_str(&content).map_err(|source| ErrorModelError::MapParse {
            path: path.to_path_buf(),
            source,
        })?;
        map.validate()?;
        tracing::info!(
            "Loaded {}x{} error map from {} (range +/-{} m)",
            map.width,
            map.height,
            path.display(),
            map.half_extent().0
        );
        Ok(map)
    }

    /// Writes the map as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ErrorModelError> {
        let path = path.as_ref();
        let content = serde_json::to_string(self).map_err(|source| ErrorModelError::MapParse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(|source| ErrorModelError::MapRead {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Synthesises a map with half-normal biases, reproducible for a given seed
    pub fn generate(width: u32, height: u32, resolution: f64, seed: u64) -> Result<Self, ErrorModelError> {
        let normal = Normal::new(0.0, SYNTHETIC_BIAS_SIGMA_PS)
            .map_err(|e| ErrorModelError::InvalidMap(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(seed);
        let cells = width as usize * height as usize;
        let bias_ps = (0..cells).map(|_| normal.sample(&mut rng).abs()).collect();
        Self::new(width, height, resolution, bias_ps)
    }

    fn validate(&self) -> Result<(), ErrorModelError> {
        if self.width == 0 || self.height == 0 {
            return Err(ErrorModelError::InvalidMap("map must have at least one cell".into()));
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(ErrorModelError::InvalidMap(format!("resolution {} must be positive", self.resolution)));
        }
        let expected = self.width as usize * self.height as usize;
        if self.bias_ps.len() != expected {
            return Err(ErrorModelError::InvalidMap(format!(
                "expected {} cells for {}x{}, found {}",
                expected,
                self.width,
                self.height,
                self.bias_ps.len()
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Half the covered extent along x and y, in metres
    pub fn half_extent(&self) -> (f64, f64) {
        (
            self.width as f64 * self.resolution / 2.0,
            self.height as f64 * self.resolution / 2.0,
        )
    }

    pub fn covers(&self, position: &Position) -> bool {
        let (hx, hy) = self.half_extent();
        position.x.abs() <= hx && position.y.abs() <= hy
    }

    /// Multipath bias at `position`, in picoseconds
    pub fn bias_at(&self, position: &Position) -> f64 {
        let (hx, hy) = self.half_extent();
        let column = cell_index(position.x + hx, self.resolution, self.width);
        let row = cell_index(position.y + hy, self.resolution, self.height);
        self.bias_ps[row * self.width as usize + column]
    }
}

fn cell_index(offset: f64, resolution: f64, cells: u32) -> usize {
    let raw = (offset / resolution).floor();
    if raw.is_nan() || raw < 0.0 {
        0
    } else {
        (raw as usize).min(cells as usize - 1)
    }
}
