use rand::RngCore;

use super::{PropagationLoss, MIN_DISTANCE_M};

/// Line-of-sight indoor office path loss: `32.4 + 17.3 log10(d) + 20 log10(f_GHz)`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeGppIndoorOffice;

impl PropagationLoss for ThreeGppIndoorOffice {
    fn name(&self) -> &'static str {
        "ThreeGppIndoorOffice"
    }

    fn loss_db(&self, distance_m: f64, frequency_hz: f64, _rng: &mut dyn RngCore) -> f64 {
        let d = distance_m.max(MIN_DISTANCE_M);
        32.4 + 17.3 * d.log10() + 20.0 * (frequency_hz / 1e9).log10()
    }
}
