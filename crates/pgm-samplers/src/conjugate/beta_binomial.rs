use std::sync::Arc;

use pgm_core::Rng;
use pgm_error::Result;
use pgm_graph::Graph;
use pgm_registry::Distribution;
use pgm_registry::distributions::DBeta;
use pgm_utils::ArenaKey;

use super::importance_weight;
use crate::classify::classify;
use crate::factory::NodeSamplerFactory;
use crate::sampler::NodeSampler;
use crate::values::ParticleValues;

/// `p ~ dbeta(a0, b0)`, every likelihood child `dbern(p)` or `dbin(p, n_i)` directly on
/// `p` (identity only — a scaled or shifted probability is no longer conjugate, so unlike
/// the normal family this one requires the affine coefficient to be exactly `(1, 0)`).
pub struct BetaBinomialFactory;

struct Trial {
    successes: f64,
    trials: f64,
}

impl NodeSamplerFactory for BetaBinomialFactory {
    fn name(&self) -> &'static str {
        "beta_binomial"
    }

    fn try_build(&self, graph: &Graph, node: ArenaKey) -> Option<Arc<dyn NodeSampler>> {
        let n = graph.node(node).ok()?;
        if n.is_bounded() {
            return None;
        }
        let prior = n.prior()?;
        if prior.name() != "dbeta" {
            return None;
        }
        let parents = n.parents();
        let a0_aff = classify(graph, parents[0], node)?;
        let b0_aff = classify(graph, parents[1], node)?;
        if !a0_aff.is_known() || !b0_aff.is_known() {
            return None;
        }
        let a0 = a0_aff.b[0];
        let b0 = b0_aff.b[0];

        let mut trials = Vec::new();
        for &child_id in graph.likelihood_children(node).ok()?.iter() {
            let child = graph.node(child_id).ok()?;
            let prior_c = child.prior()?;
            let cparents = child.parents();
            let p_aff = classify(graph, cparents[0], node)?;
            if !is_identity_scalar(&p_aff) {
                return None;
            }
            let y = child.value()?[0];
            match prior_c.name() {
                "dbern" => trials.push(Trial {
                    successes: y,
                    trials: 1.0,
                }),
                "dbin" => {
                    let n_aff = classify(graph, cparents[1], node)?;
                    if !n_aff.is_known() {
                        return None;
                    }
                    trials.push(Trial {
                        successes: y,
                        trials: n_aff.b[0],
                    });
                }
                _ => return None,
            }
        }
        if trials.is_empty() {
            return None;
        }

        Some(Arc::new(BetaBinomialSampler { a0, b0, trials }))
    }
}

fn is_identity_scalar(aff: &crate::classify::Affine) -> bool {
    aff.out_dim == 1 && aff.in_dim == 1 && aff.a == [1.0] && aff.b == [0.0]
}

struct BetaBinomialSampler {
    a0: f64,
    b0: f64,
    trials: Vec<Trial>,
}

impl NodeSampler for BetaBinomialSampler {
    fn name(&self) -> &'static str {
        "beta_binomial"
    }

    fn sample(
        &self,
        _graph: &Graph,
        node: ArenaKey,
        particle: &mut dyn ParticleValues,
        rng: &mut Rng,
    ) -> Result<f64> {
        let successes: f64 = self.trials.iter().map(|t| t.successes).sum();
        let failures: f64 = self.trials.iter().map(|t| t.trials - t.successes).sum();
        let a_post = self.a0 + successes;
        let b_post = self.b0 + failures;

        let dbeta = DBeta;
        let mut out = [0.0];
        dbeta.sample(&mut out, &[&[a_post], &[b_post]], None, rng)?;
        let p = out[0];
        particle.set(node, vec![p]);

        let log_prior = dbeta.log_density(&[p], &[&[self.a0], &[self.b0]], None)?;
        let mut log_lik = 0.0;
        for t in &self.trials {
            log_lik += t.successes * p.ln() + (t.trials - t.successes) * (1.0 - p).ln();
        }
        let log_post = dbeta.log_density(&[p], &[&[a_post], &[b_post]], None)?;
        Ok(importance_weight(log_prior, log_lik, log_post))
    }
}
