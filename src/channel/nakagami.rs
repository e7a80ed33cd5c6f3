use rand::RngCore;
use rand_distr::{Distribution, Gamma};

use super::{PropagationLoss, MIN_DISTANCE_M};
use crate::types::constants::SPEED_OF_LIGHT_M_PER_S;

/// Log-distance path loss with Nakagami-m fading on top.
///
/// The fading power gain is drawn from `Gamma(m, 1/m)`, which has unit mean.
#[derive(Debug, Clone, Copy)]
pub struct NakagamiLoss {
    pub exponent: f64,
    pub m: f64,
}

impl Default for NakagamiLoss {
    fn default() -> Self {
        Self { exponent: 3.0, m: 1.0 }
    }
}

impl NakagamiLoss {
    /// Free-space loss at the 1 m reference distance
    fn reference_loss_db(frequency_hz: f64) -> f64 {
        let wavelength = SPEED_OF_LIGHT_M_PER_S / frequency_hz;
        20.0 * (4.0 * std::f64::consts::PI / wavelength).log10()
    }

    pub fn mean_loss_db(&self, distance_m: f64, frequency_hz: f64) -> f64 {
        let d = distance_m.max(MIN_DISTANCE_M);
        Self::reference_loss_db(frequency_hz) + 10.0 * self.exponent * d.log10()
    }
}

impl PropagationLoss for NakagamiLoss {
    fn name(&self) -> &'static str {
        "Nakagami"
    }

    fn loss_db(&self, distance_m: f64, frequency_hz: f64, rng: &mut dyn RngCore) -> f64 {
        let mean = self.mean_loss_db(distance_m, frequency_hz);
        let gain = match Gamma::new(self.m, 1.0 / self.m) {
            Ok(gamma) => gamma.sample(rng),
            Err(_) => 1.0,
        };
        // Deep fades are capped so the loss stays finite
        mean - 10.0 * gain.max(1e-12).log10()
    }
}
