use std::sync::Arc;

use pgm_core::Rng;
use pgm_error::Result;
use pgm_graph::Graph;
use pgm_registry::Distribution;
use pgm_registry::distributions::DGamma;
use pgm_utils::ArenaKey;

use super::importance_weight;
use crate::classify::{Affine, classify};
use crate::factory::NodeSamplerFactory;
use crate::sampler::NodeSampler;
use crate::values::ParticleValues;

fn is_identity_scalar(aff: &Affine) -> bool {
    aff.out_dim == 1 && aff.in_dim == 1 && aff.a == [1.0] && aff.b == [0.0]
}

/// `lambda ~ dgamma(shape0, rate0)`, every likelihood child `dpois(lambda)` directly (no
/// affine transform preserves this conjugacy, so as with Beta/Binomial the rate slot must
/// classify as exactly the identity).
pub struct GammaPoissonFactory;

impl NodeSamplerFactory for GammaPoissonFactory {
    fn name(&self) -> &'static str {
        "gamma_poisson"
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

        let mut counts = Vec::new();
        for &child_id in graph.likelihood_children(node).ok()?.iter() {
            let child = graph.node(child_id).ok()?;
            let prior_c = child.prior()?;
            if prior_c.name() != "dpois" {
                return None;
            }
            let lambda_aff = classify(graph, child.parents()[0], node)?;
            if !is_identity_scalar(&lambda_aff) {
                return None;
            }
            counts.push(child.value()?[0]);
        }
        if counts.is_empty() {
            return None;
        }

        Some(Arc::new(GammaPoissonSampler { shape0, rate0, counts }))
    }
}

struct GammaPoissonSampler {
    shape0: f64,
    rate0: f64,
    counts: Vec<f64>,
}

impl NodeSampler for GammaPoissonSampler {
    fn name(&self) -> &'static str {
        "gamma_poisson"
    }

    fn sample(
        &self,
        _graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64> {
        let shape_post = self.shape0 + self.counts.iter().sum::<f64>();
        let rate_post = self.rate0 + self.counts.len() as f64;

        let dgamma = DGamma;
        let mut out = [0.0];
        dgamma.sample(&mut out, &[&[shape_post], &[rate_post]], None, rng)?;
        let lambda = out[0];
        particle.set(node, vec![lambda]);

        let log_prior = dgamma.log_density(&[lambda], &[&[self.shape0], &[self.rate0]], None)?;
        let mut log_lik = 0.0;
        for &x in &self.counts {
            log_lik += x * lambda.ln() - lambda - ln_factorial(x);
        }
        let log_post = dgamma.log_density(&[lambda], &[&[shape_post], &[rate_post]], None)?;
        Ok(importance_weight(log_prior, log_lik, log_post))
    }
}

fn ln_factorial(x: f64) -> f64 {
    statrs::function::gamma::ln_gamma(x + 1.0)
}
