use std::sync::Arc;

use pgm_core::Rng;
use pgm_error::{Result, pgm_err};
use pgm_graph::Graph;
use pgm_registry::Distribution;
use pgm_utils::ArenaKey;

use crate::factory::NodeSamplerFactory;
use crate::sampler::NodeSampler;
use crate::values::{ParticleValues, resolve, resolve_through_logicals};

/// Draws from the prior unmodified and reweights by the log-likelihood the draw induces
/// in this node's observed likelihood children. Matches every unobserved stochastic node,
/// so it is always the last entry of a factory list: the bootstrap-filter proposal that
/// exists whether or not anything smarter applies.
pub struct PriorMutationFactory;

impl NodeSamplerFactory for PriorMutationFactory {
    fn name(&self) -> &'static str {
        "prior_mutation"
    }

    fn try_build(&self, graph: &Graph, node: ArenaKey) -> Option<Arc<dyn NodeSampler>> {
        let n = graph.node(node).ok()?;
        let prior = n.prior()?.clone();
        Some(Arc::new(PriorMutationSampler { prior }))
    }
}

struct PriorMutationSampler {
    prior: Arc<dyn Distribution>,
}

impl NodeSampler for PriorMutationSampler {
    fn name(&self) -> &'static str {
        "prior_mutation"
    }

    fn sample(
        &self,
        graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64> {
        let n = graph.node(node)?;
        let bounds = resolve_bounds(graph, particle, node);
        let dim: usize = n.dim().iter().product::<usize>().max(1);
        let param_ids = n.parents().to_vec();
        let params: Vec<Vec<f64>> = param_ids
            .iter()
            .map(|&id| {
                resolve(graph, particle, id)
                    .map(|v| v.to_vec())
                    .ok_or_else(|| pgm_err!(ModelInvalid: "prior parameter value not yet resolved"))
            })
            .collect::<Result<_>>()?;
        let param_refs: Vec<&[f64]> = params.iter().map(|v| v.as_slice()).collect();

        let mut out = vec![0.0; dim];
        self.prior.sample(&mut out, &param_refs, bounds, rng)?;
        particle.set(node, out.clone());

        let mut log_weight = 0.0;
        for &child_id in graph.likelihood_children(node)?.iter() {
            let child = graph.node(child_id)?;
            let prior_c = child
                .prior()
                .ok_or_else(|| pgm_err!(ModelInvalid: "likelihood child is not stochastic"))?;
            let cparams: Vec<Vec<f64>> = child
                .parents()
                .iter()
                .map(|&id| resolve_through_logicals(graph, particle, id, node, &out))
                .collect::<Result<_>>()?;
            let cparam_refs: Vec<&[f64]> = cparams.iter().map(|v| v.as_slice()).collect();
            let y = child
                .value()
                .ok_or_else(|| pgm_err!(ModelInvalid: "observed likelihood child has no value"))?;
            log_weight += prior_c.log_density(y, &cparam_refs, resolve_bounds(graph, particle, child_id))?;
        }
        Ok(log_weight)
    }
}

fn resolve_bounds(graph: &Graph, particle: &dyn ParticleValues, id: ArenaKey) -> Option<(f64, f64)> {
    let n = graph.node(id).ok()?;
    let (lower, upper) = n.truncation()?;
    let lo = lower.and_then(|id| resolve(graph, particle, id)).map(|v| v[0]);
    let hi = upper.and_then(|id| resolve(graph, particle, id)).map(|v| v[0]);
    match (lo, hi) {
        (Some(lo), Some(hi)) => Some((lo, hi)),
        (Some(lo), None) => Some((lo, f64::INFINITY)),
        (None, Some(hi)) => Some((f64::NEG_INFINITY, hi)),
        (None, None) => None,
    }
}
