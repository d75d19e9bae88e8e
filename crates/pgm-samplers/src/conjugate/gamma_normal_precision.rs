use std::sync::Arc;

use pgm_core::Rng;
use pgm_error::Result;
use pgm_graph::Graph;
use pgm_registry::Distribution;
use pgm_registry::distributions::{DGamma, DNorm};
use pgm_utils::ArenaKey;

use super::importance_weight;
use crate::classify::{Affine, classify};
use crate::factory::NodeSamplerFactory;
use crate::sampler::NodeSampler;
use crate::values::ParticleValues;

fn is_identity_scalar(aff: &Affine) -> bool {
    aff.out_dim == 1 && aff.in_dim == 1 && aff.a == [1.0] && aff.b == [0.0]
}

struct Obs {
    mean: f64,
    y: f64,
}

/// `tau ~ dgamma(shape0, rate0)`, every likelihood child `dnorm(mu_i, tau)` with `mu_i`
/// KNOWN and `tau` appearing as exactly the node itself (precision slot, identity).
pub struct GammaNormalPrecisionFactory;

impl NodeSamplerFactory for GammaNormalPrecisionFactory {
    fn name(&self) -> &'static str {
        "gamma_normal_precision"
    }

    fn try_build(&self, graph: &Graph, node: ArenaKey) -> Option<Arc<dyn NodeSampler>> {
        let n = graph.node(node).ok()?;
        if n.is_bounded() {
            return None;
        }
        let prior = n.prior()?;
        if prior.name() != "dgamma" {
            return None;
        }
        let parents = n.parents();
        let shape_aff = classify(graph, parents[0], node)?;
        let rate_aff = classify(graph, parents[1], node)?;
        if !shape_aff.is_known() || !rate_aff.is_known() {
            return None;
        }
        let shape0 = shape_aff.b[0];
        let rate0 = rate_aff.b[0];

        let mut obs = Vec::new();
        for &child_id in graph.likelihood_children(node).ok()?.iter() {
            let child = graph.node(child_id).ok()?;
            let prior_c = child.prior()?;
            if prior_c.name() != "dnorm" {
                return None;
            }
            let cparents = child.parents();
            let mean_aff = classify(graph, cparents[0], node)?;
            if !mean_aff.is_known() {
                return None;
            }
            let tau_aff = classify(graph, cparents[1], node)?;
            if !is_identity_scalar(&tau_aff) {
                return None;
            }
            obs.push(Obs {
                mean: mean_aff.b[0],
                y: child.value()?[0],
            });
        }
        if obs.is_empty() {
            return None;
        }

        Some(Arc::new(GammaNormalPrecisionSampler { shape0, rate0, obs }))
    }
}

struct GammaNormalPrecisionSampler {
    shape0: f64,
    rate0: f64,
    obs: Vec<Obs>,
}

impl NodeSampler for GammaNormalPrecisionSampler {
    fn name(&self) -> &'static str {
        "gamma_normal_precision"
    }

    fn sample(
        &self,
        _graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64> {
        let sum_sq: f64 = self.obs.iter().map(|o| (o.y - o.mean).powi(2)).sum();
        let shape_post = self.shape0 + self.obs.len() as f64 / 2.0;
        let rate_post = self.rate0 + 0.5 * sum_sq;

        let dgamma = DGamma;
        let mut out = [0.0];
        dgamma.sample(&mut out, &[&[shape_post], &[rate_post]], None, rng)?;
        let tau = out[0];
        particle.set(node, vec![tau]);

        let log_prior = dgamma.log_density(&[tau], &[&[self.shape0], &[self.rate0]], None)?;
        let dnorm = DNorm;
        let mut log_lik = 0.0;
        for o in &self.obs {
            log_lik += dnorm.log_density(&[o.y], &[&[o.mean], &[tau]], None)?;
        }
        let log_post = dgamma.log_density(&[tau], &[&[shape_post], &[rate_post]], None)?;
        Ok(importance_weight(log_prior, log_lik, log_post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestParticle(HashMap<ArenaKey, Vec<f64>>);
    impl ParticleValues for TestParticle {
        fn get(&self, id: ArenaKey) -> Option<&[f64]> {
            self.0.get(&id).map(|v| v.as_slice())
        }
        fn set(&mut self, id: ArenaKey, value: Vec<f64>) {
            self.0.insert(id, value);
        }
    }

    #[test]
    fn posterior_precision_grows_with_more_observations() {
        let mut g = Graph::new();
        let shape0 = g.add_constant(vec![1], vec![1.0]).unwrap();
        let rate0 = g.add_constant(vec![1], vec![1.0]).unwrap();
        let tau = g.add_stochastic(Arc::new(DGamma), vec![shape0, rate0], false, None, None).unwrap();
        let mu = g.add_constant(vec![1], vec![0.0]).unwrap();
        let y = g.add_stochastic(Arc::new(DNorm), vec![mu, tau], false, None, None).unwrap();
        g.set_observation(y, vec![0.1]).unwrap();
        g.build().unwrap();

        let sampler = GammaNormalPrecisionFactory.try_build(&g, tau).unwrap();
        let mut particle = TestParticle(HashMap::new());
        let mut rng = Rng::from_seed(3);
        let w = sampler.sample(&g, tau, &mut particle, &mut rng).unwrap();
        assert!(w.is_finite());
        assert!(particle.get(tau).unwrap()[0] > 0.0);
    }
}
