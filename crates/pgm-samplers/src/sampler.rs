use pgm_core::Rng;
use pgm_error::Result;
use pgm_graph::Graph;
use pgm_utils::ArenaKey;

use crate::values::ParticleValues;

/// Proposes a value for one unobserved stochastic node and reports the log incremental
/// importance weight that draw contributes to the particle (§4.3). The new value is
/// written into `particle` rather than returned, since every sampler needs the same
/// read/write access to resolve its own parents' values through [crate::values::resolve].
pub trait NodeSampler: Send + Sync {
    fn name(&self) -> &'static str;

    fn sample(
        &self,
        graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64>;
}
