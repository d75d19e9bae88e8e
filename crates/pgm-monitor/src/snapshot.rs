use pgm_utils::ArenaKey;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One time step's worth of recorded state for a monitored node array (§4.8): the particle
/// values (outer index = particle, inner = component within the array), the matching
/// particle weights, the ESS measured that step, whether the monitored array is discrete,
/// the iteration index, and the conditioning observations in effect at that step.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorSnapshot {
    pub iteration: usize,
    pub values: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
    pub ess: f64,
    pub discrete: bool,
    pub conditionals: Vec<ArenaKey>,
}

impl MonitorSnapshot {
    pub fn n_particles(&self) -> usize {
        self.weights.len()
    }
}
