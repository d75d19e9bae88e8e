use std::collections::HashMap;

use pgm_samplers::ParticleValues;
use pgm_utils::ArenaKey;

/// One particle: its sampled values for every unobserved stochastic node scheduled so far,
/// plus its accumulated log-weight. Particles never alias each other's storage (§5).
#[derive(Clone, Debug, Default)]
pub struct Particle {
    values: HashMap<ArenaKey, Vec<f64>>,
    pub log_weight: f64,
}

impl Particle {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            log_weight: 0.0,
        }
    }

    pub fn value(&self, id: ArenaKey) -> Option<&[f64]> {
        self.values.get(&id).map(|v| v.as_slice())
    }
}

impl ParticleValues for Particle {
    fn get(&self, id: ArenaKey) -> Option<&[f64]> {
        self.values.get(&id).map(|v| v.as_slice())
    }

    fn set(&mut self, id: ArenaKey, value: Vec<f64>) {
        self.values.insert(id, value);
    }
}
