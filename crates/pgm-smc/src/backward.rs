use std::sync::Arc;

use pgm_core::Engine;
use pgm_error::{Result, pgm_bail};
use pgm_graph::Graph;
use pgm_registry::Distribution;
use pgm_samplers::{resolve, resolve_through_logicals};
use pgm_utils::ArenaKey;

use crate::forward::FilterSnapshot;
use crate::resample::effective_sample_size;

/// Result of one backward step (§4.7): the time index just recomputed and the ESS of the
/// smoothing weights at that index.
#[derive(Debug, Clone, Copy)]
pub struct BackwardEpoch {
    pub t: usize,
    pub ess: f64,
}

/// Replays a completed forward pass's filtering clouds back to front, reweighting each
/// cloud by the smoothing kernel. Only constructible from a finished [crate::forward::ForwardSampler]
/// (its `history`), and invalidated the instant the underlying data changes — that
/// invalidation is the facade's job (§4.8), not this type's.
pub struct BackwardSmoother {
    graph: Arc<Graph>,
    history: Vec<FilterSnapshot>,
    smoothing_weights: Vec<f64>,
    t: usize,
}

impl BackwardSmoother {
    pub fn new(graph: Arc<Graph>, history: Vec<FilterSnapshot>) -> Result<Self> {
        if history.is_empty() {
            pgm_bail!(LifecycleViolation: "no forward pass to smooth: run_forward must complete first");
        }
        let last = history.last().unwrap();
        let weights = normalize(&last.particles.iter().map(|p| p.log_weight).collect::<Vec<_>>());
        let t = history.len() - 1;
        Ok(Self {
            graph,
            history,
            smoothing_weights: weights,
            t,
        })
    }

    pub fn current_t(&self) -> usize {
        self.t
    }

    pub fn smoothing_weights(&self) -> &[f64] {
        &self.smoothing_weights
    }

    pub fn is_complete(&self) -> bool {
        self.t == 0
    }

    /// The filtering cloud at the current backward index, re-weighted by
    /// [Self::smoothing_weights] — what a backward-smooth monitor records each step.
    pub fn current_particles(&self) -> &[crate::particle::Particle] {
        &self.history[self.t].particles
    }
}

impl Engine for BackwardSmoother {
    type Epoch = BackwardEpoch;

    fn next(&mut self) -> Result<Self::Epoch> {
        if self.is_complete() {
            pgm_bail!(LifecycleViolation: "backward smoother already reached its first iteration");
        }

        let next_snapshot = &self.history[self.t];
        let cur_snapshot = &self.history[self.t - 1];
        let node = next_snapshot.node;
        let prior = self
            .graph
            .node(node)?
            .prior()
            .ok_or_else(|| pgm_error::pgm_err!(ModelInvalid: "scheduled node is not stochastic"))?
            .clone();
        let parents = self.graph.node(node)?.parents().to_vec();
        let bounds_ids = self.graph.node(node)?.truncation();

        let n = cur_snapshot.particles.len();
        let mut raw = vec![0.0f64; n];

        for (i, particle_i) in cur_snapshot.particles.iter().enumerate() {
            // `node` can never be its own ancestor (the graph is acyclic), so this override
            // never actually fires — it only lets a transition parameter that is a logical
            // function of an ancestor (e.g. `x[t] <- scale(x[t-1], phi)`) be recomputed from
            // that ancestor's already-sampled values instead of needing a baked-in value.
            let params: Vec<Vec<f64>> = parents
                .iter()
                .map(|&pid| resolve_through_logicals(&self.graph, particle_i, pid, node, &[]))
                .collect::<Result<_>>()?;
            let param_refs: Vec<&[f64]> = params.iter().map(|v| v.as_slice()).collect();
            let bounds = resolve_bounds(&self.graph, particle_i, bounds_ids);

            let mut cross = 0.0;
            for (j, particle_j) in next_snapshot.particles.iter().enumerate() {
                let y = particle_j
                    .value(node)
                    .ok_or_else(|| pgm_error::pgm_err!(ModelInvalid: "descendant particle missing its own sampled value"))?;
                let log_density = prior.log_density(y, &param_refs, bounds)?;
                cross += self.smoothing_weights[j] * log_density.exp();
            }
            raw[i] = cross;
        }

        let filter_weights: Vec<f64> = cur_snapshot.particles.iter().map(|p| p.log_weight).collect();
        let filter_normalized = normalize(&filter_weights);
        let combined: Vec<f64> = raw.iter().zip(filter_normalized.iter()).map(|(c, f)| c * f).collect();
        let smoothing_weights = normalize_linear(&combined);

        let ess = effective_sample_size(&smoothing_weights);
        self.smoothing_weights = smoothing_weights;
        self.t -= 1;

        Ok(BackwardEpoch { t: self.t, ess })
    }
}

fn normalize(log_weights: &[f64]) -> Vec<f64> {
    let max = log_weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = log_weights.iter().map(|w| (w - max).exp()).collect();
    normalize_linear(&exps)
}

fn normalize_linear(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let n = weights.len() as f64;
        return vec![1.0 / n; weights.len()];
    }
    weights.iter().map(|w| w / total).collect()
}

fn resolve_bounds(
    graph: &Graph,
    particle: &dyn pgm_samplers::ParticleValues,
    bounds: Option<(Option<ArenaKey>, Option<ArenaKey>)>,
) -> Option<(f64, f64)> {
    let (lower, upper) = bounds?;
    let lo = lower.and_then(|id| resolve(graph, particle, id)).map(|v| v[0]);
    let hi = upper.and_then(|id| resolve(graph, particle, id)).map(|v| v[0]);
    match (lo, hi) {
        (Some(lo), Some(hi)) => Some((lo, hi)),
        (Some(lo), None) => Some((lo, f64::INFINITY)),
        (None, Some(hi)) => Some((f64::NEG_INFINITY, hi)),
        (None, None) => None,
    }
}
