use std::sync::Arc;

use pgm_core::{Engine, Rng};
use pgm_error::{Result, ensure, pgm_bail};
use pgm_graph::Graph;
use pgm_samplers::NodeSamplerFactory;
use pgm_utils::ArenaKey;

use crate::particle::Particle;
use crate::resample::{ResampleMethod, effective_sample_size, resample_indices};
use crate::schedule::Schedule;

/// The full filtering cloud as it stood right after scheduling step `node`, kept so the
/// backward smoother can replay it without re-running the forward pass.
pub struct FilterSnapshot {
    pub node: ArenaKey,
    pub particles: Vec<Particle>,
}

/// Result of one forward iteration (§4.6): the time index just completed, the ESS measured
/// before any resample, and whether a resample fired.
#[derive(Debug, Clone, Copy)]
pub struct ForwardEpoch {
    pub t: usize,
    pub ess: f64,
    pub resampled: bool,
    pub log_norm_const: f64,
}

impl ForwardEpoch {
    pub fn is_complete(&self, schedule_len: usize) -> bool {
        self.t >= schedule_len
    }
}

/// Drives `n_particles` independent particles through the node schedule one node at a time,
/// resampling when ESS collapses below `ess_threshold * n_particles`. Implements [Engine]
/// so a driver advances it with [pgm_core::EngineExt::run].
pub struct ForwardSampler {
    graph: Arc<Graph>,
    schedule: Schedule,
    particles: Vec<Particle>,
    rng: Rng,
    method: ResampleMethod,
    ess_threshold: f64,
    t: usize,
    log_norm_const: f64,
    prev_log_mean_weight: f64,
    history: Vec<FilterSnapshot>,
}

impl ForwardSampler {
    pub fn new(
        graph: Arc<Graph>,
        factories: &[Arc<dyn NodeSamplerFactory>],
        n_particles: usize,
        seed: u64,
        method: ResampleMethod,
        ess_threshold: f64,
    ) -> Result<Self> {
        if ess_threshold <= 0.0 || ess_threshold > 1.0 {
            pgm_bail!(ModelInvalid: "ess_threshold must lie in (0, 1], got {}", ess_threshold);
        }
        if n_particles == 0 {
            pgm_bail!(ModelInvalid: "n_particles must be positive");
        }
        let schedule = Schedule::build(&graph, factories)?;
        let particles = (0..n_particles).map(|_| Particle::new()).collect();
        Ok(Self {
            graph,
            schedule,
            particles,
            rng: Rng::from_seed(seed),
            method,
            ess_threshold,
            t: 0,
            log_norm_const: 0.0,
            prev_log_mean_weight: 0.0,
            history: Vec::new(),
        })
    }

    pub fn n_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn log_norm_const(&self) -> f64 {
        self.log_norm_const
    }

    pub fn is_complete(&self) -> bool {
        self.t >= self.schedule.len()
    }

    /// Consumes the sampler, handing its per-iteration filtering clouds to the backward
    /// smoother. Only meaningful once `is_complete()`.
    pub fn into_history(self) -> Vec<FilterSnapshot> {
        self.history
    }
}

impl Engine for ForwardSampler {
    type Epoch = ForwardEpoch;

    fn next(&mut self) -> Result<Self::Epoch> {
        if self.is_complete() {
            pgm_bail!(LifecycleViolation: "forward sampler already reached its final iteration");
        }

        let node = self.schedule.node_at(self.t);
        let sampler = self.schedule.sampler_at(self.t).clone();
        for particle in &mut self.particles {
            let log_incr = sampler.sample(&self.graph, node, particle, &mut self.rng)?;
            ensure!(!log_incr.is_nan(), NumericFailure: "node {} produced a NaN incremental log-weight", node.index());
            particle.log_weight += log_incr;
        }

        let weights: Vec<f64> = self.particles.iter().map(|p| p.log_weight.exp()).collect();
        let n = weights.len() as f64;
        let mean_w = weights.iter().sum::<f64>() / n;
        let log_mean_w = if mean_w > 0.0 { mean_w.ln() } else { f64::NEG_INFINITY };
        self.log_norm_const += log_mean_w - self.prev_log_mean_weight;

        let ess = effective_sample_size(&weights);
        let mut resampled = false;
        if ess / n < self.ess_threshold {
            let indices = resample_indices(&weights, self.method, &mut self.rng);
            let resampled_particles: Vec<Particle> = indices.iter().map(|&i| self.particles[i].clone()).collect();
            self.particles = resampled_particles;
            for particle in &mut self.particles {
                particle.log_weight = log_mean_w;
            }
            resampled = true;
            tracing::debug!(t = self.t, ess, n = weights.len(), "resampled");
        }
        self.prev_log_mean_weight = log_mean_w;

        self.history.push(FilterSnapshot {
            node,
            particles: self.particles.clone(),
        });
        self.t += 1;

        Ok(ForwardEpoch {
            t: self.t,
            ess,
            resampled,
            log_norm_const: self.log_norm_const,
        })
    }
}
